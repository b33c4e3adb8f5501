//! Role-based visibility for the request *read* path. This is an
//! access-control concern for listing and fetching, kept entirely outside
//! the workflow engine: callers compute the filter once per actor and the
//! repository applies it to its queries.

use crate::domain::department::DepartmentId;
use crate::domain::request::Request;
use crate::domain::user::{User, UserId, UserRole};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisibilityFilter {
    /// Admin and purchasing see everything.
    All,
    /// Staff see only the requests they authored.
    OwnedBy(UserId),
    /// Managers see their home department.
    InDepartment(DepartmentId),
    /// Directors see the departments where they hold an approver record.
    InDepartments(Vec<DepartmentId>),
    /// A manager without a home department or a director without approver
    /// records sees nothing.
    Nothing,
}

/// `approver_departments` is only consulted for directors; pass the
/// departments where the user holds approver records.
pub fn visibility_filter(user: &User, approver_departments: &[DepartmentId]) -> VisibilityFilter {
    match user.role {
        UserRole::Staff => VisibilityFilter::OwnedBy(user.id),
        UserRole::Manager => match user.department_id {
            Some(department_id) => VisibilityFilter::InDepartment(department_id),
            None => VisibilityFilter::Nothing,
        },
        UserRole::Director => {
            if approver_departments.is_empty() {
                VisibilityFilter::Nothing
            } else {
                VisibilityFilter::InDepartments(approver_departments.to_vec())
            }
        }
        UserRole::Admin | UserRole::Purchasing => VisibilityFilter::All,
    }
}

impl VisibilityFilter {
    pub fn allows(&self, request: &Request) -> bool {
        match self {
            Self::All => true,
            Self::OwnedBy(user_id) => request.user_id == *user_id,
            Self::InDepartment(department_id) => request.department_id == *department_id,
            Self::InDepartments(department_ids) => department_ids.contains(&request.department_id),
            Self::Nothing => false,
        }
    }
}
