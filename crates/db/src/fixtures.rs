use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use concierge_core::domain::catalog::{CatalogEntry, Sensitivity};
use concierge_core::domain::request::{Request, RequestId, RequestState};
use concierge_core::domain::work_order::{CompletionStatus, WorkOrder, WorkOrderStatus};
use concierge_core::domain::Capability;

use crate::repositories::{
    RepositoryError, RequestRepository, SqlRequestRepository, SqlWorkOrderRepository,
    WorkOrderRepository,
};
use crate::DbPool;

/// The demo reference catalog: the groups, hardware and onboarding targets
/// every environment without a live feed runs against.
pub fn demo_catalog() -> Vec<CatalogEntry> {
    let mut entries = vec![
        CatalogEntry::group(
            "finance_team",
            "Finance Team",
            "Finance team access group",
            "john.doe@company.com",
            Sensitivity::High,
        ),
        CatalogEntry::group(
            "hr_team",
            "HR Team",
            "HR team access group",
            "jane.smith@company.com",
            Sensitivity::Elevated,
        ),
        CatalogEntry::group(
            "engineering_team",
            "Engineering Team",
            "Engineering team access group",
            "tech.lead@company.com",
            Sensitivity::Moderate,
        ),
        CatalogEntry::group(
            "marketing_team",
            "Marketing Team",
            "Marketing team access group",
            "marketing.lead@company.com",
            Sensitivity::Low,
        ),
        CatalogEntry::group(
            "admin_group",
            "Administrators",
            "Administrative access group",
            "admin@company.com",
            Sensitivity::Critical,
        ),
    ];

    let equipment: [(&str, &str, &str, i64, u32); 12] = [
        ("macbook_pro_14", "MacBook Pro 14-inch", "M3 Pro, 18GB RAM, 512GB SSD", 2_499, 15),
        ("macbook_air_13", "MacBook Air 13-inch", "M2, 16GB RAM, 256GB SSD", 1_299, 25),
        ("thinkpad_x1", "ThinkPad X1 Carbon", "Intel i7, 16GB RAM, 512GB SSD", 1_899, 20),
        ("dell_latitude", "Dell Latitude 7420", "Intel i5, 8GB RAM, 256GB SSD", 1_199, 30),
        ("dell_27_4k", "Dell UltraSharp 27\" 4K", "27-inch, 4K UHD, USB-C", 599, 40),
        ("lg_24_fhd", "LG 24\" Full HD", "24-inch, 1080p, HDMI/VGA", 199, 60),
        ("wireless_mouse", "Logitech MX Master 3", "Wireless, ergonomic, multi-device", 99, 100),
        ("mechanical_keyboard", "Keychron K2 Wireless", "Mechanical, wireless, compact", 89, 50),
        ("webcam", "Logitech C920 HD Pro", "1080p, auto-focus, stereo audio", 79, 75),
        ("headset", "Jabra Evolve2 65", "Wireless, noise-canceling, UC certified", 229, 80),
        ("docking_station", "CalDigit TS3 Plus", "Thunderbolt 3, 15 ports, 87W charging", 249, 35),
        ("iphone_15_pro", "iPhone 15 Pro", "128GB, Titanium, A17 Pro", 999, 20),
    ];
    for (id, model, specs, cost, available) in equipment {
        entries.push(CatalogEntry::equipment(
            id,
            model,
            specs,
            "it.assets@company.com",
            Decimal::new(cost, 0),
            available,
        ));
    }

    entries.push(CatalogEntry {
        id: "standard_account".to_string(),
        capability: Capability::Identity,
        display_name: "Standard Employee Account".to_string(),
        description: "Directory account, mailbox, and default groups".to_string(),
        owner: "it.identity@company.com".to_string(),
        sensitivity: Sensitivity::Low,
        unit_cost: None,
        available: None,
    });
    entries.push(CatalogEntry {
        id: "orientation_day_one".to_string(),
        capability: Capability::HrOrientation,
        display_name: "Day-One HR Orientation".to_string(),
        description: "Policy overview, benefits enrollment, paperwork".to_string(),
        owner: "hr.orientation@company.com".to_string(),
        sensitivity: Sensitivity::Low,
        unit_cost: None,
        available: None,
    });
    entries.push(CatalogEntry {
        id: "welcome_meeting".to_string(),
        capability: Capability::Meetings,
        display_name: "Manager Welcome Meeting".to_string(),
        description: "First-day welcome with the direct manager".to_string(),
        owner: "workplace@company.com".to_string(),
        sensitivity: Sensitivity::Low,
        unit_cost: None,
        available: None,
    });

    entries
}

/// Starting group rosters mirroring the demo directory.
pub fn demo_rosters() -> Vec<(String, Vec<String>)> {
    vec![
        (
            "finance_team".to_string(),
            vec!["alice@company.com".to_string(), "bob@company.com".to_string()],
        ),
        (
            "hr_team".to_string(),
            vec!["carol@company.com".to_string(), "dave@company.com".to_string()],
        ),
        (
            "engineering_team".to_string(),
            vec!["dev1@company.com".to_string(), "dev2@company.com".to_string()],
        ),
        (
            "marketing_team".to_string(),
            vec!["marketer1@company.com".to_string(), "marketer2@company.com".to_string()],
        ),
        ("admin_group".to_string(), vec!["admin1@company.com".to_string()]),
    ]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub requests: usize,
    pub work_orders: usize,
}

/// Loads a small worked example into the database: one closed auto-approved
/// request and one request still waiting on its approval chain.
pub async fn seed_demo_requests(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let requests = SqlRequestRepository::new(pool.clone());
    let orders = SqlWorkOrderRepository::new(pool.clone());
    let now = Utc::now();

    let mut closed = Request {
        id: RequestId("REQ-SEED0001".to_string()),
        capability: Capability::Access,
        subject: "marketing_team".to_string(),
        requester: "manager@company.com".to_string(),
        beneficiary: "mike.marketing@company.com".to_string(),
        state: RequestState::Closed,
        sensitivity: Sensitivity::Low,
        justification: Some("campaign tooling".to_string()),
        approvals: Vec::new(),
        work_order_id: None,
        state_note: None,
        created_at: now - Duration::days(2),
        expires_at: Some(now + Duration::days(88)),
        closed_at: Some(now - Duration::days(1)),
    };

    let mut order = WorkOrder::materialize(
        closed.id.clone(),
        Capability::Access,
        closed.subject.clone(),
        closed.beneficiary.clone(),
        closed.created_at,
    );
    order.status = WorkOrderStatus::Closed;
    order.completion = Some(CompletionStatus::Success);
    order.notes = Some("membership granted".to_string());
    order.closed_at = closed.closed_at;
    closed.work_order_id = Some(order.id.clone());

    requests.save(closed).await?;
    orders.save(order).await?;

    requests
        .save(Request {
            id: RequestId("REQ-SEED0002".to_string()),
            capability: Capability::Access,
            subject: "finance_team".to_string(),
            requester: "manager@company.com".to_string(),
            beneficiary: "john.new@company.com".to_string(),
            state: RequestState::PendingApproval,
            sensitivity: Sensitivity::High,
            justification: Some("quarterly reporting".to_string()),
            approvals: Vec::new(),
            work_order_id: None,
            state_note: None,
            created_at: now,
            expires_at: Some(now + Duration::days(90)),
            closed_at: None,
        })
        .await?;

    Ok(SeedSummary { requests: 2, work_orders: 1 })
}

#[cfg(test)]
mod tests {
    use concierge_core::domain::catalog::Sensitivity;
    use concierge_core::domain::Capability;

    use crate::repositories::{RequestFilter, RequestRepository, SqlRequestRepository};
    use crate::{connect_with_settings, migrations};

    use super::{demo_catalog, demo_rosters, seed_demo_requests};

    #[test]
    fn demo_catalog_covers_every_capability() {
        let catalog = demo_catalog();

        for capability in concierge_core::domain::ONBOARDING_SEQUENCE {
            assert!(
                catalog.iter().any(|entry| entry.capability == capability),
                "no demo entry for {capability}"
            );
        }

        let finance = catalog.iter().find(|entry| entry.id == "finance_team").expect("finance");
        assert_eq!(finance.sensitivity, Sensitivity::High);
        let marketing =
            catalog.iter().find(|entry| entry.id == "marketing_team").expect("marketing");
        assert_eq!(marketing.sensitivity, Sensitivity::Low);
    }

    #[test]
    fn demo_rosters_cover_every_group() {
        let rosters = demo_rosters();
        let catalog = demo_catalog();

        for entry in catalog.iter().filter(|entry| entry.capability == Capability::Access) {
            assert!(rosters.iter().any(|(group, _)| group == &entry.id));
        }
    }

    #[tokio::test]
    async fn demo_seed_loads_into_sqlite() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let summary = seed_demo_requests(&pool).await.expect("seed");
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.work_orders, 1);

        let requests = SqlRequestRepository::new(pool);
        let all = requests.list(&RequestFilter::default()).await.expect("list");
        assert_eq!(all.len(), 2);
    }
}
