use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Update-mode boundary for one account, keyed by fakeid in the history store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryMarker {
    #[serde(default)]
    pub last_article_title: Option<String>,
    #[serde(default)]
    pub last_article_url: Option<String>,
}

/// Archive-mode boundary: account display name → newest link of its last block.
pub type FirstMarkers = HashMap<String, String>;
