//! Admin access capability.

use std::collections::HashSet;

/// Decides whether a signed-in user may use the admin views.
///
/// Pass it to whatever needs it; there is no global instance.
pub trait AdminAccessChecker: Send + Sync {
    fn is_admin(&self, email: &str) -> bool;
}

/// Allow-list of admin emails. Matching ignores case and surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailAllowList {
    emails: HashSet<String>,
}

impl EmailAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl AdminAccessChecker for EmailAllowList {
    fn is_admin(&self, email: &str) -> bool {
        self.emails.contains(&normalize(email))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
