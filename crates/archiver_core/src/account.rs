use std::collections::HashSet;

use thiserror::Error;

/// A configured content account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Position in the configured account list.
    pub index: usize,
    /// Opaque identifier used by the listing API.
    pub fakeid: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountListError {
    #[error("no accounts configured")]
    Empty,
    #[error("account id list has {ids} entries but name list has {names}")]
    LengthMismatch { ids: usize, names: usize },
    #[error("account id {0} is configured more than once")]
    DuplicateId(String),
    #[error("account at position {0} has an empty id")]
    EmptyId(usize),
    /// Names key the archive log's first markers, so two accounts may not share one.
    #[error("account name {0} is configured more than once")]
    DuplicateName(String),
}

impl Account {
    /// Build the ordered account sequence from `(fakeid, display_name)` pairs.
    pub fn from_pairs<I, A, B>(pairs: I) -> Result<Vec<Account>, AccountListError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut names = HashSet::new();
        let mut accounts = Vec::new();
        for (index, (fakeid, name)) in pairs.into_iter().enumerate() {
            let fakeid = fakeid.into().trim().to_string();
            if fakeid.is_empty() {
                return Err(AccountListError::EmptyId(index));
            }
            if !seen.insert(fakeid.clone()) {
                return Err(AccountListError::DuplicateId(fakeid));
            }
            let display_name = name.into().trim().to_string();
            // Unnamed accounts take their folder from the page nickname.
            if !display_name.is_empty() && !names.insert(display_name.clone()) {
                return Err(AccountListError::DuplicateName(display_name));
            }
            accounts.push(Account {
                index,
                fakeid,
                display_name,
            });
        }
        if accounts.is_empty() {
            return Err(AccountListError::Empty);
        }
        Ok(accounts)
    }

    /// Join two parallel lists (ids, names) by position.
    ///
    /// Lists of different length are rejected instead of silently attaching
    /// names to the wrong account.
    pub fn join_lists(
        ids: Vec<String>,
        names: Vec<String>,
    ) -> Result<Vec<Account>, AccountListError> {
        if ids.len() != names.len() {
            return Err(AccountListError::LengthMismatch {
                ids: ids.len(),
                names: names.len(),
            });
        }
        Self::from_pairs(ids.into_iter().zip(names))
    }
}
