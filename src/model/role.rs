use serde::Serialize;
use strum_macros::{AsRefStr, Display};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Hr = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        assert_eq!(Role::from_id(Role::Admin.id()), Some(Role::Admin));
        assert_eq!(Role::from_id(Role::Hr.id()), Some(Role::Hr));
        assert_eq!(Role::from_id(9), None);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(Role::Hr.to_string(), "hr");
        assert_eq!(Role::Admin.as_ref(), "admin");
    }
}
