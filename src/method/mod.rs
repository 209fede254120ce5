//! Calculation-method resolution from geocoded country names.

mod aliases;
mod resolver;
mod table;

pub use aliases::{normalize_country_name, AliasRule, MatchKind, ALIAS_RULES};
pub use resolver::MethodResolver;
pub use table::{CountryMethodTable, TableError, BUNDLED_TABLE};
