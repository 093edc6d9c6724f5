pub const DEFAULT_API_ENDPOINT: &str = "https://rum.fastly-aem.page";
pub const DEFAULT_DOMAIN: &str = "www.thinktanked.org";
pub const API_KEY_PARAM: &str = "domainkey";
pub const ORG_SCOPE_SUFFIX: &str = ":all";
pub const ORG_SCOPE_EXCEPTION: &str = "aem.live:all";
pub const BUNDLES_FIELD: &str = "rumBundles";
pub const TIME_SLOT_FIELD: &str = "timeSlot";
pub const USER_AGENT: &str = "rum-loader/0.1";
pub const DATA_DIR_ENV: &str = "RUM_LOADER_DATA_DIR";
