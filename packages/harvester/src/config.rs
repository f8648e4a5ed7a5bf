//! Configuration constants and lookup tables for the harvester.

use std::time::Duration;

use crate::error::{HarvesterError, Result};

/// Base URL of the Korea Fair Trade Commission website.
pub const FTC_BASE_URL: &str = "https://www.ftc.go.kr";

/// Path of the committee-jurisdiction law listing page.
pub const LISTING_PATH: &str = "/www/selectCmitJrsdLawordList.do";

/// Base URL for the national law information centre. Relative image paths
/// inside detail frames resolve against this host.
pub const LAW_GO_KR_BASE_URL: &str = "https://www.law.go.kr";

/// Search endpoint of the national law information centre (DRF).
pub const LAW_CENTRE_SEARCH_URL: &str = "https://www.law.go.kr/DRF/lawSearch.do";

/// Base of the public data portal mirror of the law search API.
pub const DATA_PORTAL_BASE_URL: &str = "https://apis.data.go.kr/1170000";

/// HTTP timeout in seconds for listing and API requests.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Navigation timeout in seconds for a single page render.
pub const NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Default pause before each listing request.
pub const DEFAULT_LISTING_DELAY: Duration = Duration::from_secs(1);

/// Default time the renderer waits after load before capturing the DOM.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// How long to wait for the embedded detail frame.
pub const FRAME_WAIT: Duration = Duration::from_secs(10);

/// How long each frame selector waits for its element.
pub const SELECTOR_WAIT: Duration = Duration::from_secs(2);

/// Id of the iframe that carries the statute text on detail pages.
pub const DETAIL_FRAME_ID: &str = "lawService";

/// Browser-like user agent. The listing site rejects obvious bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Number of listing categories published by the site.
pub const CATEGORY_COUNT: u8 = 14;

/// Page key for each category code, indexed by `code - 1`.
///
/// The site numbers its pages out of order around categories 10 and 11.
const PAGE_KEYS: [u16; 14] = [
    299, 300, 301, 302, 303, 304, 305, 306, 307, 309, 308, 310, 311, 312,
];

/// Classification code sent alongside each page key, indexed by `code - 1`.
const CLASSIFICATION_CODES: [u8; 14] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 13, 14, 11];

/// A listing category (1 to 14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(u8);

impl Category {
    /// Create a category, rejecting codes outside `1..=14`.
    ///
    /// # Examples
    /// ```
    /// use ftclaw_harvester::config::Category;
    ///
    /// assert!(Category::new(1).is_ok());
    /// assert!(Category::new(15).is_err());
    /// ```
    pub fn new(code: u8) -> Result<Self> {
        if (1..=CATEGORY_COUNT).contains(&code) {
            Ok(Self(code))
        } else {
            Err(HarvesterError::InvalidCategory(code.to_string()))
        }
    }

    /// Parse a category from user input such as `"3"` or `"03"`.
    pub fn parse(input: &str) -> Result<Self> {
        let code = input
            .trim()
            .parse::<u8>()
            .map_err(|_| HarvesterError::InvalidCategory(input.to_string()))?;
        Self::new(code)
    }

    /// All categories in site order.
    pub fn all() -> impl Iterator<Item = Category> {
        (1..=CATEGORY_COUNT).map(Category)
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self.0
    }

    /// Page key the site expects for this category.
    #[must_use]
    pub fn page_key(self) -> u16 {
        page_key_for(self.0)
    }

    /// Classification code the site expects for this category.
    #[must_use]
    pub fn classification_code(self) -> u8 {
        classification_code_for(self.0)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Page key for a raw code. Codes outside the table fall back to `298 + code`.
#[must_use]
pub fn page_key_for(code: u8) -> u16 {
    usize::from(code)
        .checked_sub(1)
        .and_then(|i| PAGE_KEYS.get(i))
        .copied()
        .unwrap_or(298 + u16::from(code))
}

/// Classification code for a raw code. Codes outside the table map to themselves.
#[must_use]
pub fn classification_code_for(code: u8) -> u8 {
    usize::from(code)
        .checked_sub(1)
        .and_then(|i| CLASSIFICATION_CODES.get(i))
        .copied()
        .unwrap_or(code)
}

/// Build the listing URL for a category against the given site base.
///
/// # Examples
/// ```
/// use ftclaw_harvester::config::{listing_url, Category, FTC_BASE_URL};
///
/// let cat = Category::new(11).unwrap();
/// assert_eq!(
///     listing_url(FTC_BASE_URL, cat),
///     "https://www.ftc.go.kr/www/selectCmitJrsdLawordList.do?key=308&searchLawordClCd=12"
/// );
/// ```
#[must_use]
pub fn listing_url(base_url: &str, category: Category) -> String {
    format!(
        "{}{LISTING_PATH}?key={}&searchLawordClCd={:02}",
        base_url.trim_end_matches('/'),
        category.page_key(),
        category.classification_code()
    )
}
