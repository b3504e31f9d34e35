use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A kind of user of our application, having defined rights.
///
/// Users themselves live with the external membership service; these are
/// markers selecting the rights an [`AuthToken`](super::AuthToken) must carry.
pub trait User {
    /// The rights of this user type.
    const RIGHTS: Rights;
}

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rights {
    Member,
    Admin,
}

impl Rights {
    /// Do these rights include `target`? Admins are also members.
    pub fn includes(self, target: Rights) -> bool {
        self == target || self == Rights::Admin
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Member => "member",
                Self::Admin => "admin",
            }
        )
    }
}

/// Any signed-in member of the organisation.
pub struct Member;

/// An election administrator.
pub struct Admin;

impl User for Member {
    const RIGHTS: Rights = Rights::Member;
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_are_members() {
        assert!(Rights::Admin.includes(Rights::Member));
        assert!(Rights::Admin.includes(Rights::Admin));
        assert!(Rights::Member.includes(Rights::Member));
        assert!(!Rights::Member.includes(Rights::Admin));
    }
}
