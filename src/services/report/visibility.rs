use crate::middleware::AuthUser;
use crate::models::{
    report::{self, ReportType, Visibility},
    user::UserRole,
    ReportModel,
};
use sea_orm::{ColumnTrait, Condition};
use uuid::Uuid;

/// Which reports a viewer may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    /// Operational report types, plus anything they authored.
    Admin(Uuid),
    /// Executive report types, plus anything public.
    Executive,
    /// Only their own reports.
    Own(Uuid),
}

impl ReportScope {
    pub fn for_viewer(viewer: &AuthUser) -> Self {
        match viewer.role {
            UserRole::Admin => ReportScope::Admin(viewer.user_id),
            UserRole::Owner => ReportScope::Executive,
            _ => ReportScope::Own(viewer.user_id),
        }
    }

    pub fn condition(&self) -> Condition {
        match *self {
            ReportScope::Admin(user_id) => Condition::any()
                .add(report::Column::ReportType.is_in(ReportType::ADMIN))
                .add(report::Column::CreatedBy.eq(user_id)),
            ReportScope::Executive => Condition::any()
                .add(report::Column::ReportType.is_in(ReportType::EXECUTIVE))
                .add(report::Column::Visibility.eq(Visibility::Public)),
            ReportScope::Own(user_id) => {
                Condition::all().add(report::Column::CreatedBy.eq(user_id))
            }
        }
    }

    /// Same rule as [`ReportScope::condition`], for a row already loaded.
    pub fn allows(&self, report: &ReportModel) -> bool {
        match *self {
            ReportScope::Admin(user_id) => {
                ReportType::ADMIN.contains(&report.report_type) || report.created_by == user_id
            }
            ReportScope::Executive => {
                ReportType::EXECUTIVE.contains(&report.report_type)
                    || report.visibility == Visibility::Public
            }
            ReportScope::Own(user_id) => report.created_by == user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::{FileFormat, PeriodType, ReportStatus};
    use chrono::NaiveDate;

    fn report(report_type: ReportType, created_by: Uuid, visibility: Visibility) -> ReportModel {
        let now = chrono::Utc::now().naive_utc();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ReportModel {
            id: Uuid::new_v4(),
            report_type,
            title: "t".into(),
            description: None,
            period_type: PeriodType::Monthly,
            period_start: day,
            period_end: day,
            file_format: FileFormat::Csv,
            status: ReportStatus::Completed,
            report_data: None,
            summary_data: None,
            file_url: None,
            file_size: None,
            visibility,
            is_scheduled: false,
            schedule_cron: None,
            error_message: None,
            notes: None,
            created_by,
            generated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn viewer(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            username: "v".into(),
            role,
        }
    }

    #[test]
    fn admin_sees_operational_types_and_own_financials() {
        let admin = viewer(UserRole::Admin);
        let scope = ReportScope::for_viewer(&admin);
        let stranger = Uuid::new_v4();
        assert!(scope.allows(&report(ReportType::Sales, stranger, Visibility::Private)));
        assert!(!scope.allows(&report(ReportType::Financial, stranger, Visibility::Public)));
        assert!(scope.allows(&report(ReportType::Financial, admin.user_id, Visibility::Private)));
    }

    #[test]
    fn owner_sees_executive_types() {
        let scope = ReportScope::for_viewer(&viewer(UserRole::Owner));
        assert!(scope.allows(&report(
            ReportType::Financial,
            Uuid::new_v4(),
            Visibility::Private
        )));
    }

    #[test]
    fn other_roles_see_only_their_own() {
        let seller = viewer(UserRole::Seller);
        let scope = ReportScope::for_viewer(&seller);
        assert_eq!(scope, ReportScope::Own(seller.user_id));
        assert!(scope.allows(&report(ReportType::Sales, seller.user_id, Visibility::Private)));
        assert!(!scope.allows(&report(ReportType::Sales, Uuid::new_v4(), Visibility::Public)));
    }
}
