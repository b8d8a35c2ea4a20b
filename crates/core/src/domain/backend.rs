// Backend and protocol tags

use serde::{Deserialize, Serialize};

/// The four heterogeneous backends that participate in every transaction
///
/// The declaration order is the fixed forward order of every protocol;
/// negative paths walk it in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Relational task-record store
    Store,
    /// Key-value cache
    Cache,
    /// Document store
    DocumentStore,
    /// Message broker
    Broker,
}

impl Backend {
    /// Fixed forward order
    pub const ORDER: [Backend; 4] = [
        Backend::Store,
        Backend::Cache,
        Backend::DocumentStore,
        Backend::Broker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Store => "store",
            Backend::Cache => "cache",
            Backend::DocumentStore => "document_store",
            Backend::Broker => "broker",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistency protocol used for one coordinator run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "2PC")]
    TwoPhaseCommit,
    #[serde(rename = "TCC")]
    Tcc,
    #[serde(rename = "Saga")]
    Saga,
}

impl Protocol {
    /// Pattern label reported to callers
    pub fn label(&self) -> &'static str {
        match self {
            Protocol::TwoPhaseCommit => "2PC",
            Protocol::Tcc => "TCC",
            Protocol::Saga => "Saga",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
