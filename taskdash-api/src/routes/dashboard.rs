/// Role-aware dashboard
///
/// `GET /api/dashboard` answers with a different payload per role. The
/// admin counts are independent queries and run concurrently.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use taskdash_shared::{
    auth::{authorization::Permission, middleware::AuthContext},
    models::{
        task::Task,
        user::{User, UserRole},
    },
};

/// System-wide counts shown to administrators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub active_users: i64,
    pub suspended_users: i64,
    pub admin_count: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
}

/// Personal summary shown to members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    pub welcome: String,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DashboardData {
    Admin(AdminStats),
    Member(MemberStats),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub role: UserRole,
    pub message: String,
    pub data: DashboardData,
}

impl MemberStats {
    pub fn new(name: &str, total_tasks: i64, completed_tasks: i64) -> Self {
        Self {
            welcome: format!("Hello {}", name),
            total_tasks,
            completed_tasks,
            pending_tasks: (total_tasks - completed_tasks).max(0),
        }
    }
}

/// Dashboard endpoint
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardResponse>> {
    if !auth.role.can(Permission::ViewAdminDashboard) {
        let (total, completed) = tokio::try_join!(
            Task::count_for_user(&state.db, auth.user_id),
            Task::count_completed_for_user(&state.db, auth.user_id),
        )?;

        return Ok(Json(DashboardResponse {
            role: auth.role,
            message: "Member dashboard".to_string(),
            data: DashboardData::Member(MemberStats::new(&auth.name, total, completed)),
        }));
    }

    let (total_users, active_users, admin_count, total_tasks, completed_tasks) = tokio::try_join!(
        User::count(&state.db),
        User::count_active(&state.db),
        User::count_by_role(&state.db, UserRole::Admin),
        Task::count(&state.db),
        Task::count_completed(&state.db),
    )?;

    let response = DashboardResponse {
        role: auth.role,
        message: "Admin dashboard".to_string(),
        data: DashboardData::Admin(AdminStats {
            total_users,
            active_users,
            suspended_users: total_users - active_users,
            admin_count,
            total_tasks,
            completed_tasks,
        }),
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_stats() {
        let stats = MemberStats::new("Ada", 5, 2);
        assert_eq!(stats.welcome, "Hello Ada");
        assert_eq!(stats.pending_tasks, 3);
    }

    #[test]
    fn test_admin_payload_shape() {
        let response = DashboardResponse {
            role: UserRole::Admin,
            message: "Admin dashboard".to_string(),
            data: DashboardData::Admin(AdminStats {
                total_users: 3,
                active_users: 2,
                suspended_users: 1,
                admin_count: 1,
                total_tasks: 4,
                completed_tasks: 1,
            }),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["data"]["suspendedUsers"], 1);
        assert_eq!(json["data"]["adminCount"], 1);
    }

    #[test]
    fn test_member_payload_shape() {
        let response = DashboardResponse {
            role: UserRole::Member,
            message: "Member dashboard".to_string(),
            data: DashboardData::Member(MemberStats::new("Ada", 1, 0)),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "member");
        assert_eq!(json["data"]["welcome"], "Hello Ada");
        assert_eq!(json["data"]["pendingTasks"], 1);
    }
}
