//! Role guard.
//!
//! Two privilege levels protect the vault:
//!
//! - **Owner** — transfers ownership, appoints the admin and the treasury
//! - **Admin** — sets fees, pauses, triggers emergency withdrawal and
//!   recovers foreign tokens
//!
//! Every privileged operation calls [`Roles::authorize`] before doing
//! anything else.

use std::fmt;

use autovault_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::{AuthorizationError, ValidationError};

/// Privilege required by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Owner,
    Admin,
}

/// A configurable role address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    Treasury,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Admin => f.write_str("admin"),
            Role::Treasury => f.write_str("treasury"),
        }
    }
}

/// Current holders of the vault roles. None of them is ever the zero address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    owner: Address,
    admin: Address,
    treasury: Address,
}

impl Roles {
    /// # Errors
    ///
    /// - [`ValidationError::ZeroAddress`] if any role is the zero address
    pub fn new(owner: Address, admin: Address, treasury: Address) -> Result<Self, ValidationError> {
        non_zero(Role::Owner, owner)?;
        non_zero(Role::Admin, admin)?;
        non_zero(Role::Treasury, treasury)?;
        Ok(Self {
            owner,
            admin,
            treasury,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Recipient of performance and withdrawal fees.
    pub fn treasury(&self) -> Address {
        self.treasury
    }

    /// Check that `caller` holds `capability`.
    ///
    /// # Errors
    ///
    /// - [`AuthorizationError::NotOwner`] / [`AuthorizationError::NotAdmin`]
    pub fn authorize(&self, caller: Address, capability: Capability) -> Result<(), AuthorizationError> {
        match capability {
            Capability::Owner if caller != self.owner => Err(AuthorizationError::NotOwner { caller }),
            Capability::Admin if caller != self.admin => Err(AuthorizationError::NotAdmin { caller }),
            _ => Ok(()),
        }
    }

    /// Replace the admin. Returns the previous admin.
    pub fn set_admin(&mut self, admin: Address) -> Result<Address, ValidationError> {
        non_zero(Role::Admin, admin)?;
        Ok(std::mem::replace(&mut self.admin, admin))
    }

    /// Replace the treasury. Returns the previous treasury.
    pub fn set_treasury(&mut self, treasury: Address) -> Result<Address, ValidationError> {
        non_zero(Role::Treasury, treasury)?;
        Ok(std::mem::replace(&mut self.treasury, treasury))
    }

    /// Hand ownership to `owner`. Returns the previous owner.
    pub fn transfer_ownership(&mut self, owner: Address) -> Result<Address, ValidationError> {
        non_zero(Role::Owner, owner)?;
        Ok(std::mem::replace(&mut self.owner, owner))
    }
}

fn non_zero(role: Role, address: Address) -> Result<(), ValidationError> {
    if address.is_zero() {
        return Err(ValidationError::ZeroAddress { role });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> Roles {
        Roles::new(
            Address::from_label("owner"),
            Address::from_label("admin"),
            Address::from_label("treasury"),
        )
        .expect("roles")
    }

    #[test]
    fn test_authorize() {
        let roles = roles();
        let owner = Address::from_label("owner");
        let admin = Address::from_label("admin");

        roles.authorize(owner, Capability::Owner).expect("owner");
        roles.authorize(admin, Capability::Admin).expect("admin");

        // The roles are distinct: neither implies the other.
        assert_eq!(
            roles.authorize(admin, Capability::Owner),
            Err(AuthorizationError::NotOwner { caller: admin })
        );
        assert_eq!(
            roles.authorize(owner, Capability::Admin),
            Err(AuthorizationError::NotAdmin { caller: owner })
        );
    }

    #[test]
    fn test_zero_address_rejected() {
        assert!(Roles::new(Address::ZERO, Address::from_label("a"), Address::from_label("t")).is_err());

        let mut roles = roles();
        assert_eq!(
            roles.set_admin(Address::ZERO),
            Err(ValidationError::ZeroAddress { role: Role::Admin })
        );
        assert_eq!(
            roles.set_treasury(Address::ZERO),
            Err(ValidationError::ZeroAddress { role: Role::Treasury })
        );
        assert!(roles.transfer_ownership(Address::ZERO).is_err());
        assert_eq!(roles.admin(), Address::from_label("admin"));
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut roles = roles();
        let user = Address::from_label("user1");
        assert_eq!(roles.set_admin(user).expect("set"), Address::from_label("admin"));
        assert_eq!(roles.admin(), user);
        assert_eq!(roles.set_treasury(user).expect("set"), Address::from_label("treasury"));
        assert_eq!(roles.transfer_ownership(user).expect("set"), Address::from_label("owner"));
        assert_eq!(roles.owner(), user);
    }
}
