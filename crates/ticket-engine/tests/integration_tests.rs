//! Integration tests for the ticket engine
//!
//! These tests drive the full stack — server wrapper, allocation engine,
//! queue index, code generator — against a real SQLite database, and
//! verify the externally observable allocation behavior.

use anyhow::Result;
use serial_test::serial;
use tellerq_ticket_engine::prelude::*;

async fn create_test_hall() -> Result<TicketHallServer> {
    let server = TicketHallServerBuilder::new()
        .with_config(EngineConfig::default())
        .with_in_memory_database()
        .build()
        .await?;

    server.create_default_services().await?;
    Ok(server)
}

fn service_by_tag(services: &[Service], tag: &str) -> ServiceId {
    services
        .iter()
        .find(|s| s.tag == tag)
        .expect("seeded service")
        .id
}

#[tokio::test]
#[serial]
async fn enqueue_positions_count_up_with_queue_length() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let deposits = service_by_tag(&services, "D");

    for expected in 1..=5usize {
        let receipt = server.kiosk_api().take_ticket(deposits).await.unwrap();
        assert_eq!(receipt.position_in_queue, expected);
        assert_eq!(receipt.queue_length, expected);
    }
}

#[tokio::test]
#[serial]
async fn codes_are_distinct_and_suffixes_increase() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let deposits = service_by_tag(&services, "D");

    let mut last_suffix = 0u64;
    for _ in 0..4 {
        let receipt = server.kiosk_api().take_ticket(deposits).await.unwrap();
        let (tag, suffix) = receipt
            .code
            .as_str()
            .split_once('-')
            .expect("tag-sequence format");
        assert_eq!(tag, "D");
        let suffix: u64 = suffix.parse().expect("numeric suffix");
        assert!(suffix > last_suffix, "suffixes must strictly increase");
        last_suffix = suffix;
    }
}

#[tokio::test]
#[serial]
async fn three_tickets_then_dispatch_scenario() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let deposits = service_by_tag(&services, "D");

    let codes: Vec<String> = {
        let mut codes = Vec::new();
        for _ in 0..3 {
            let receipt = server.kiosk_api().take_ticket(deposits).await.unwrap();
            codes.push(receipt.code.as_str().to_string());
        }
        codes
    };
    assert_eq!(codes, vec!["D-001", "D-002", "D-003"]);

    let counters = server
        .create_test_counters(vec![("Counter 1", vec!["D"])])
        .await
        .unwrap();

    let called = server
        .clerk_api()
        .next_ticket(counters[0].id)
        .await
        .unwrap()
        .expect("a ticket should be waiting");
    assert_eq!(called.code.as_str(), "D-001");
    assert_eq!(called.service_tag, "D");

    // The dispatched ticket is now CALLED with this counter and timestamp
    let ticket = server
        .store()
        .find_by_code(&called.code)
        .await
        .unwrap()
        .expect("dispatched ticket exists");
    assert_eq!(ticket.status, TicketStatus::Called);
    assert_eq!(ticket.counter_id, Some(counters[0].id));
    assert!(ticket.called_at.is_some());

    // And the board reports two remaining
    let status = server.supervisor_api().queue_status().await.unwrap();
    let deposits_row = status.iter().find(|e| e.service_tag == "D").unwrap();
    assert_eq!(deposits_row.queue_length, 2);
}

#[tokio::test]
#[serial]
async fn dispatch_is_fifo_within_a_service() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let deposits = service_by_tag(&services, "D");
    let counters = server
        .create_test_counters(vec![("Counter 1", vec!["D"])])
        .await
        .unwrap();

    for _ in 0..3 {
        server.kiosk_api().take_ticket(deposits).await.unwrap();
    }

    let mut called_codes = Vec::new();
    while let Some(called) = server.clerk_api().next_ticket(counters[0].id).await.unwrap() {
        called_codes.push(called.code.as_str().to_string());
    }
    assert_eq!(called_codes, vec!["D-001", "D-002", "D-003"]);
}

#[tokio::test]
#[serial]
async fn dispatch_never_crosses_capability_lines() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let loans = service_by_tag(&services, "L");
    let counters = server
        .create_test_counters(vec![("Deposits only", vec!["D"])])
        .await
        .unwrap();

    // Only loans have customers; the deposits-only counter sees nothing
    server.kiosk_api().take_ticket(loans).await.unwrap();
    let called = server.clerk_api().next_ticket(counters[0].id).await.unwrap();
    assert!(called.is_none());
}

#[tokio::test]
#[serial]
async fn inactive_counter_is_refused() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let deposits = service_by_tag(&services, "D");
    let counters = server
        .create_test_counters(vec![("Counter 1", vec!["D"])])
        .await
        .unwrap();
    server.kiosk_api().take_ticket(deposits).await.unwrap();

    server
        .store()
        .set_counter_active(counters[0].id, false)
        .await
        .unwrap();

    let err = server
        .clerk_api()
        .next_ticket(counters[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketEngineError::CounterInactive(_)));
}

#[tokio::test]
#[serial]
async fn unknown_and_unequipped_counters_fail_distinctly() {
    let server = create_test_hall().await.expect("hall creation failed");

    let err = server
        .clerk_api()
        .next_ticket(CounterId(9999))
        .await
        .unwrap_err();
    assert!(matches!(err, TicketEngineError::CounterNotFound(_)));

    let counters = server
        .create_test_counters(vec![("Bare counter", vec![])])
        .await
        .unwrap();
    let err = server
        .clerk_api()
        .next_ticket(counters[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketEngineError::CounterHasNoServices(_)));
}

#[tokio::test]
#[serial]
async fn dispatch_with_nobody_waiting_is_empty_not_an_error() {
    let server = create_test_hall().await.expect("hall creation failed");
    let counters = server
        .create_test_counters(vec![("Counter 1", vec!["D", "W", "L", "A"])])
        .await
        .unwrap();

    let called = server.clerk_api().next_ticket(counters[0].id).await.unwrap();
    assert!(called.is_none());
}

#[tokio::test]
#[serial]
async fn unknown_service_enqueue_leaves_no_trace() {
    let server = create_test_hall().await.expect("hall creation failed");

    let err = server
        .kiosk_api()
        .take_ticket(ServiceId(9999))
        .await
        .unwrap_err();
    assert!(matches!(err, TicketEngineError::ServiceNotFound(_)));

    // No ticket was persisted anywhere and every queue is still empty
    let status = server.supervisor_api().queue_status().await.unwrap();
    assert!(status.iter().all(|e| e.queue_length == 0));
    let stats = server.supervisor_api().stats().await.unwrap();
    assert_eq!(stats.total_waiting, 0);
}

#[tokio::test]
#[serial]
async fn completing_twice_is_a_conflict() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let deposits = service_by_tag(&services, "D");
    let counters = server
        .create_test_counters(vec![("Counter 1", vec!["D"])])
        .await
        .unwrap();

    server.kiosk_api().take_ticket(deposits).await.unwrap();
    let called = server
        .clerk_api()
        .next_ticket(counters[0].id)
        .await
        .unwrap()
        .expect("ticket waiting");

    server.clerk_api().complete_ticket(&called.code).await.unwrap();
    let err = server
        .clerk_api()
        .complete_ticket(&called.code)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketEngineError::AlreadyServed(_)));

    let ticket = server
        .store()
        .find_by_code(&called.code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Served);
    assert!(ticket.served_at.is_some());
}

#[tokio::test]
#[serial]
async fn completing_an_unknown_ticket_is_not_found() {
    let server = create_test_hall().await.expect("hall creation failed");
    let err = server
        .clerk_api()
        .complete_ticket(&TicketCode::from("Z-999"))
        .await
        .unwrap_err();
    assert!(matches!(err, TicketEngineError::TicketNotFound(_)));
}

#[tokio::test]
#[serial]
async fn reported_lengths_match_the_store() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let deposits = service_by_tag(&services, "D");
    let loans = service_by_tag(&services, "L");

    for _ in 0..3 {
        server.kiosk_api().take_ticket(deposits).await.unwrap();
    }
    server.kiosk_api().take_ticket(loans).await.unwrap();

    for entry in server.supervisor_api().queue_status().await.unwrap() {
        let waiting = server
            .store()
            .waiting_for_service(entry.service_id)
            .await
            .unwrap();
        assert_eq!(entry.queue_length, waiting.len());
    }
}

#[tokio::test]
#[serial]
async fn wait_estimates_scale_with_queue_length() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let loans = service_by_tag(&services, "L");
    let avg = services.iter().find(|s| s.tag == "L").unwrap().avg_service_minutes as u64;

    server.kiosk_api().take_ticket(loans).await.unwrap();
    server.kiosk_api().take_ticket(loans).await.unwrap();

    let status = server.supervisor_api().queue_status().await.unwrap();
    let loans_row = status.iter().find(|e| e.service_tag == "L").unwrap();
    assert_eq!(loans_row.estimated_wait_minutes, 2 * avg);
}

#[tokio::test]
#[serial]
async fn queue_order_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("hall.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());

    {
        let server = TicketHallServerBuilder::new()
            .with_database_url(&url)
            .build()
            .await
            .expect("first hall");
        let services = server.create_default_services().await.unwrap();
        let deposits = service_by_tag(&services, "D");
        for _ in 0..3 {
            server.kiosk_api().take_ticket(deposits).await.unwrap();
        }
        server
            .create_test_counters(vec![("Counter 1", vec!["D"])])
            .await
            .unwrap();
    }

    // Fresh process over the same database: hydration must restore FIFO
    let server = TicketHallServerBuilder::new()
        .with_database_url(&url)
        .build()
        .await
        .expect("second hall");
    let counters = server.supervisor_api().list_counters().await.unwrap();
    let called = server
        .clerk_api()
        .next_ticket(counters[0].id)
        .await
        .unwrap()
        .expect("ticket waiting after restart");
    assert_eq!(called.code.as_str(), "D-001");

    let status = server.supervisor_api().queue_status().await.unwrap();
    let deposits_row = status.iter().find(|e| e.service_tag == "D").unwrap();
    assert_eq!(deposits_row.queue_length, 2);
}

#[tokio::test]
#[serial]
async fn stats_reflect_waiting_and_counters() {
    let server = create_test_hall().await.expect("hall creation failed");
    let services = server.store().list_services().await.unwrap();
    let deposits = service_by_tag(&services, "D");
    server
        .create_test_counters(vec![("Counter 1", vec!["D"]), ("Counter 2", vec!["L"])])
        .await
        .unwrap();

    server.kiosk_api().take_ticket(deposits).await.unwrap();
    server.kiosk_api().take_ticket(deposits).await.unwrap();

    let stats = server.supervisor_api().stats().await.unwrap();
    assert_eq!(stats.total_waiting, 2);
    assert_eq!(stats.services, 4);
    assert_eq!(stats.counters, 2);
    assert_eq!(stats.active_counters, 2);
}
