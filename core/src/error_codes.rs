//! Stable error identifiers surfaced by `code()` on every error enum.

pub const SCHEMA_DUPLICATE_RELATIONSHIP: &str = "PBIT_SCHEMA_001";
pub const SCHEMA_DUPLICATE_COLUMN: &str = "PBIT_SCHEMA_002";
pub const SCHEMA_DUPLICATE_TABLE: &str = "PBIT_SCHEMA_003";
pub const SCHEMA_DUPLICATE_MEASURE: &str = "PBIT_SCHEMA_004";
pub const SCHEMA_MISSING_ENTITY: &str = "PBIT_SCHEMA_005";
pub const SCHEMA_MALFORMED_DOCUMENT: &str = "PBIT_SCHEMA_006";
pub const SCHEMA_SOURCE_PATH: &str = "PBIT_SCHEMA_007";

pub const ENCODING_ODD_LENGTH: &str = "PBIT_ENCODING_001";
pub const ENCODING_INVALID_UTF16: &str = "PBIT_ENCODING_002";
pub const ENCODING_INVALID_JSON: &str = "PBIT_ENCODING_003";
pub const ENCODING_SERIALIZE: &str = "PBIT_ENCODING_004";

pub const CONTAINER_IO: &str = "PBIT_CONTAINER_001";
pub const CONTAINER_ZIP: &str = "PBIT_CONTAINER_002";
pub const CONTAINER_NOT_ZIP: &str = "PBIT_CONTAINER_003";
pub const CONTAINER_MISSING_PART: &str = "PBIT_CONTAINER_004";
pub const CONTAINER_TOO_MANY_ENTRIES: &str = "PBIT_CONTAINER_005";
pub const CONTAINER_PART_TOO_LARGE: &str = "PBIT_CONTAINER_006";
pub const CONTAINER_TOTAL_TOO_LARGE: &str = "PBIT_CONTAINER_007";

pub const CONFIG_INVALID: &str = "PBIT_CONFIG_001";
