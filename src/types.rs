/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted value does not name a known variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {kind} value: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a string-backed enum stored in TEXT columns.
///
/// Generates `as_str`, `FromStr`, `TryFrom<String>` (used by `#[sqlx(try_from = "String")]`
/// on row structs), `Display` and snake_case serde.
#[macro_export]
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::types::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::types::ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::types::ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Commercial plan of a firm. Gates which modules the firm may use.
    pub enum AccountTier {
        Simples => "simples",
        Composta => "composta",
        Gerencial => "gerencial",
    }
}

text_enum! {
    /// A gated product area.
    pub enum Feature {
        Crm => "crm",
        Projects => "projects",
        Tasks => "tasks",
        Publications => "publications",
        CashFlow => "cash_flow",
        Billing => "billing",
        Reports => "reports",
        TeamManagement => "team_management",
    }
}

text_enum! {
    /// Account role. `Root` users belong to the platform, not to a tenant.
    pub enum Role {
        Root => "root",
        Admin => "admin",
        Member => "member",
    }
}

impl AccountTier {
    fn rank(&self) -> u8 {
        match self {
            AccountTier::Simples => 0,
            AccountTier::Composta => 1,
            AccountTier::Gerencial => 2,
        }
    }

    /// Cheapest tier that includes `feature`.
    pub fn minimum_for(feature: Feature) -> AccountTier {
        match feature {
            Feature::Crm | Feature::Projects | Feature::Tasks | Feature::Publications => AccountTier::Simples,
            Feature::CashFlow | Feature::Billing => AccountTier::Composta,
            Feature::Reports | Feature::TeamManagement => AccountTier::Gerencial,
        }
    }

    /// Whether this tier is `other` or a more complete one
    pub fn covers(&self, other: AccountTier) -> bool {
        self.rank() >= other.rank()
    }

    pub fn allows(&self, feature: Feature) -> bool {
        self.rank() >= Self::minimum_for(feature).rank()
    }

    pub fn features(&self) -> Vec<Feature> {
        Feature::ALL.iter().copied().filter(|f| self.allows(*f)).collect()
    }

    /// Cheapest tier with room for more users than this one, `None` when already unlimited.
    pub fn upgrade_for_users(&self) -> Option<AccountTier> {
        match self {
            AccountTier::Simples => Some(AccountTier::Composta),
            AccountTier::Composta => Some(AccountTier::Gerencial),
            AccountTier::Gerencial => None,
        }
    }

    /// Maximum number of active users, `None` when unlimited.
    pub fn max_users(&self) -> Option<i64> {
        match self {
            AccountTier::Simples => Some(1),
            AccountTier::Composta => Some(5),
            AccountTier::Gerencial => None,
        }
    }
}

impl Role {
    pub fn is_tenant_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Pagination parameters shared by list endpoints
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self { limit, offset }
    }

    /// Limit and offset with configured defaults and the configured cap applied.
    pub fn resolve(&self) -> (i64, i64) {
        let filter = &crate::config::config().filter;
        let limit = self.limit.unwrap_or(filter.default_limit).clamp(1, filter.max_limit);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}
