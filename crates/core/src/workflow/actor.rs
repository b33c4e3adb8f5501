use crate::domain::approver::Approver;
use crate::domain::user::{User, UserRole};

/// Authorization class of an acting user, resolved once per action instead
/// of re-dispatching on the raw role inside every rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleClass {
    Staff,
    Manager,
    Director,
    AdminOrPurchasing,
}

impl RoleClass {
    pub fn of(role: UserRole) -> Self {
        match role {
            UserRole::Staff => Self::Staff,
            UserRole::Manager => Self::Manager,
            UserRole::Director => Self::Director,
            UserRole::Admin | UserRole::Purchasing => Self::AdminOrPurchasing,
        }
    }
}

/// Everything the permission gate needs about an actor, loaded up front:
/// the user row and, when present, the actor's approver record in the
/// department of the request being acted on.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorContext {
    pub user: User,
    pub role_class: RoleClass,
    pub approver: Option<Approver>,
}

impl ActorContext {
    pub fn new(user: User, approver: Option<Approver>) -> Self {
        let role_class = RoleClass::of(user.role);
        Self { user, role_class, approver }
    }
}
