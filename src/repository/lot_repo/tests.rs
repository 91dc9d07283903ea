use super::LotRepository;
use crate::domain::allocation::{Allocation, AllocationBatch, AllocationStrategy};
use crate::domain::lot::Lot;
use crate::domain::types::{InventoryTxnType, QualityStatus};
use crate::repository::error::RepositoryError;
use crate::repository::lot_query::LotQuery;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

fn setup_test_repo() -> LotRepository {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    LotRepository::from_connection(Arc::new(Mutex::new(conn)))
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

fn make_test_lot(lot_id: &str, qty: &str, manufactured_on: NaiveDate) -> Lot {
    Lot {
        lot_id: lot_id.to_string(),
        lot_number: format!("LN-{}", lot_id),
        tenant_id: "T1".to_string(),
        warehouse_id: "WH1".to_string(),
        product_id: "P-100".to_string(),
        work_order_id: None,
        parent_lot_id: None,
        initial_quantity: dec(qty),
        current_quantity: dec(qty),
        unit: "kg".to_string(),
        manufactured_on,
        expires_on: None,
        quality_status: QualityStatus::Pass,
        supplier_name: Some("ACME".to_string()),
        supplier_lot_number: None,
        remarks: None,
        active: true,
        revision: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn batch_of(lines: &[(&str, &str)]) -> AllocationBatch {
    AllocationBatch {
        strategy: AllocationStrategy::Fifo,
        tenant_id: "T1".to_string(),
        warehouse_id: "WH1".to_string(),
        product_id: "P-100".to_string(),
        required_quantity: lines.iter().map(|(_, q)| dec(q)).sum(),
        allocations: lines
            .iter()
            .map(|(lot_id, qty)| Allocation {
                lot_id: lot_id.to_string(),
                lot_number: format!("LN-{}", lot_id),
                allocated_quantity: dec(qty),
                available_quantity: dec(qty),
                expires_on: None,
            })
            .collect(),
    }
}

// ==========================================
// 建批与查询
// ==========================================

#[test]
fn test_create_and_find_by_id() {
    let repo = setup_test_repo();
    let mut lot = make_test_lot("L1", "12.500", date(1, 1));
    lot.expires_on = Some(date(6, 30));
    lot.work_order_id = Some("WO-1".to_string());

    repo.create_lot(&lot, Some("alice")).unwrap();

    let found = repo.find_by_id("T1", "L1").unwrap().unwrap();
    assert_eq!(found.lot_number, "LN-L1");
    assert_eq!(found.current_quantity, dec("12.5"));
    assert_eq!(found.expires_on, Some(date(6, 30)));
    assert_eq!(found.work_order_id.as_deref(), Some("WO-1"));
    assert_eq!(found.quality_status, QualityStatus::Pass);
    assert!(found.active);

    // 其他租户不可见
    assert!(repo.find_by_id("T2", "L1").unwrap().is_none());

    let by_number = repo.find_by_lot_number("T1", "LN-L1").unwrap().unwrap();
    assert_eq!(by_number.lot_id, "L1");

    let txns = repo.list_transactions("T1", "L1").unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].txn_type, InventoryTxnType::Receipt);
    assert_eq!(txns[0].quantity_delta, dec("12.5"));
    assert_eq!(txns[0].operator.as_deref(), Some("alice"));
}

#[test]
fn test_create_rejects_invalid_and_duplicate() {
    let repo = setup_test_repo();

    let mut bad = make_test_lot("L1", "10", date(1, 1));
    bad.current_quantity = dec("11");
    assert!(matches!(
        repo.create_lot(&bad, None),
        Err(RepositoryError::ValidationError(_))
    ));

    repo.create_lot(&make_test_lot("L1", "10", date(1, 1)), None)
        .unwrap();

    // 同租户同批次号
    let mut dup = make_test_lot("L2", "10", date(1, 1));
    dup.lot_number = "LN-L1".to_string();
    assert!(matches!(
        repo.create_lot(&dup, None),
        Err(RepositoryError::UniqueConstraintViolation(_))
    ));

    // 不同租户允许同批次号
    dup.tenant_id = "T2".to_string();
    assert!(repo.create_lot(&dup, None).is_ok());
}

#[test]
fn test_find_eligible_lots_excludes_inactive_and_exhausted() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("A", "10", date(1, 1)), None)
        .unwrap();
    repo.create_lot(&make_test_lot("B", "10", date(1, 2)), None)
        .unwrap();
    let mut empty = make_test_lot("C", "10", date(1, 3));
    empty.current_quantity = Decimal::ZERO;
    repo.create_lot(&empty, None).unwrap();
    let mut held = make_test_lot("D", "10", date(1, 4));
    held.quality_status = QualityStatus::Hold;
    repo.create_lot(&held, None).unwrap();
    let mut other_wh = make_test_lot("E", "10", date(1, 5));
    other_wh.warehouse_id = "WH2".to_string();
    repo.create_lot(&other_wh, None).unwrap();

    repo.deactivate_lot("T1", "B", None, None).unwrap();

    let lots = repo.find_eligible_lots("T1", "WH1", "P-100").unwrap();
    let ids: Vec<&str> = lots.iter().map(|l| l.lot_id.as_str()).collect();
    // 质量状态由引擎判定，仓储不过滤
    assert_eq!(ids, vec!["A", "D"]);

    let all = repo.list_by_product("T1", "WH1", "P-100").unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn test_find_lot_by_id_requires_matching_scope() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("A", "10", date(1, 1)), None)
        .unwrap();

    assert!(repo
        .find_lot_by_id("T1", "WH1", "P-100", "A")
        .unwrap()
        .is_some());
    assert!(repo
        .find_lot_by_id("T1", "WH2", "P-100", "A")
        .unwrap()
        .is_none());
    assert!(repo
        .find_lot_by_id("T1", "WH1", "P-200", "A")
        .unwrap()
        .is_none());
}

#[test]
fn test_find_lots_expiring_between_is_inclusive() {
    let repo = setup_test_repo();
    for (id, expiry) in [
        ("A", Some(date(3, 1))),
        ("B", Some(date(3, 10))),
        ("C", Some(date(3, 11))),
        ("D", None),
    ] {
        let mut lot = make_test_lot(id, "5", date(1, 1));
        lot.expires_on = expiry;
        repo.create_lot(&lot, None).unwrap();
    }

    let lots = repo
        .find_lots_expiring_between("T1", date(3, 1), date(3, 10))
        .unwrap();
    let ids: Vec<&str> = lots.iter().map(|l| l.lot_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
}

// ==========================================
// 出库扣减
// ==========================================

#[test]
fn test_consume_allocations_decrements_and_logs() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("L1", "50", date(1, 1)), None)
        .unwrap();
    repo.create_lot(&make_test_lot("L2", "30", date(1, 5)), None)
        .unwrap();

    let txns = repo
        .consume_allocations("T1", &batch_of(&[("L1", "50"), ("L2", "10")]), Some("WO-7"), Some("bob"))
        .unwrap();

    assert_eq!(txns.len(), 2);
    assert_eq!(txns[0].txn_type, InventoryTxnType::Issue);
    assert_eq!(txns[0].quantity_delta, dec("-50"));
    assert_eq!(txns[0].quantity_after, Decimal::ZERO);
    assert_eq!(txns[1].quantity_after, dec("20"));
    assert_eq!(txns[1].reference.as_deref(), Some("WO-7"));

    let l1 = repo.find_by_id("T1", "L1").unwrap().unwrap();
    let l2 = repo.find_by_id("T1", "L2").unwrap().unwrap();
    assert_eq!(l1.current_quantity, Decimal::ZERO);
    assert_eq!(l1.revision, 1);
    assert_eq!(l2.current_quantity, dec("20"));

    let history = repo.list_transactions("T1", "L2").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].txn_type, InventoryTxnType::Issue);
}

#[test]
fn test_consume_stale_batch_rolls_back_everything() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("L1", "50", date(1, 1)), None)
        .unwrap();
    repo.create_lot(&make_test_lot("L2", "30", date(1, 5)), None)
        .unwrap();

    // 他人先扣走 L2 的 25
    repo.consume_allocations("T1", &batch_of(&[("L2", "25")]), None, None)
        .unwrap();

    let err = repo
        .consume_allocations("T1", &batch_of(&[("L1", "50"), ("L2", "10")]), None, None)
        .unwrap_err();
    match err {
        RepositoryError::ConcurrentModification {
            lot_id,
            requested,
            available,
        } => {
            assert_eq!(lot_id, "L2");
            assert_eq!(requested, dec("10"));
            assert_eq!(available, dec("5"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // L1 未被扣减（整批回滚）
    let l1 = repo.find_by_id("T1", "L1").unwrap().unwrap();
    assert_eq!(l1.current_quantity, dec("50"));
    assert_eq!(repo.list_transactions("T1", "L1").unwrap().len(), 1);
}

#[test]
fn test_consume_rejects_deactivated_and_foreign_lots() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("L1", "50", date(1, 1)), None)
        .unwrap();
    repo.deactivate_lot("T1", "L1", Some("quarantine"), None)
        .unwrap();

    assert!(matches!(
        repo.consume_allocations("T1", &batch_of(&[("L1", "1")]), None, None),
        Err(RepositoryError::ConcurrentModification { .. })
    ));

    assert!(matches!(
        repo.consume_allocations("T1", &batch_of(&[("NOPE", "1")]), None, None),
        Err(RepositoryError::NotFound { .. })
    ));

    assert!(matches!(
        repo.consume_allocations("T2", &batch_of(&[("L1", "1")]), None, None),
        Err(RepositoryError::ValidationError(_))
    ));

    assert!(matches!(
        repo.consume_allocations("T1", &batch_of(&[("L1", "0")]), None, None),
        Err(RepositoryError::FieldValueError { .. })
    ));
}

// ==========================================
// 拆批 / 调整 / 停用
// ==========================================

#[test]
fn test_split_lot_moves_quantity_to_child() {
    let repo = setup_test_repo();
    let mut parent = make_test_lot("P1", "40", date(1, 1));
    parent.expires_on = Some(date(4, 1));
    repo.create_lot(&parent, None).unwrap();

    let child = repo
        .split_lot("T1", "P1", dec("15"), "LN-P1-A", Some("carol"))
        .unwrap();

    assert_eq!(child.parent_lot_id.as_deref(), Some("P1"));
    assert_eq!(child.initial_quantity, dec("15"));
    assert_eq!(child.current_quantity, dec("15"));
    assert_eq!(child.expires_on, Some(date(4, 1)));
    assert_eq!(child.manufactured_on, date(1, 1));

    let parent = repo.find_by_id("T1", "P1").unwrap().unwrap();
    assert_eq!(parent.current_quantity, dec("25"));
    assert_eq!(parent.revision, 1);

    let stored_child = repo.find_by_id("T1", &child.lot_id).unwrap().unwrap();
    assert_eq!(stored_child.lot_number, "LN-P1-A");

    let parent_txns = repo.list_transactions("T1", "P1").unwrap();
    assert_eq!(parent_txns.last().unwrap().txn_type, InventoryTxnType::SplitOut);
    let child_txns = repo.list_transactions("T1", &child.lot_id).unwrap();
    assert_eq!(child_txns.len(), 1);
    assert_eq!(child_txns[0].txn_type, InventoryTxnType::SplitIn);
}

#[test]
fn test_split_lot_rejects_overdraw_and_duplicate_number() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("P1", "10", date(1, 1)), None)
        .unwrap();

    assert!(matches!(
        repo.split_lot("T1", "P1", dec("11"), "X", None),
        Err(RepositoryError::BusinessRuleViolation(_))
    ));
    assert!(matches!(
        repo.split_lot("T1", "P1", Decimal::ZERO, "X", None),
        Err(RepositoryError::FieldValueError { .. })
    ));
    assert!(matches!(
        repo.split_lot("T1", "P1", dec("1"), "LN-P1", None),
        Err(RepositoryError::UniqueConstraintViolation(_))
    ));

    // 失败后母批不变
    let parent = repo.find_by_id("T1", "P1").unwrap().unwrap();
    assert_eq!(parent.current_quantity, dec("10"));
    assert_eq!(parent.revision, 0);
}

#[test]
fn test_adjust_quantity_with_optimistic_lock() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("L1", "20", date(1, 1)), None)
        .unwrap();

    let updated = repo
        .adjust_quantity("T1", "L1", dec("18"), 0, Some("cycle count"), None)
        .unwrap();
    assert_eq!(updated.current_quantity, dec("18"));
    assert_eq!(updated.revision, 1);

    // 过期 revision
    match repo.adjust_quantity("T1", "L1", dec("17"), 0, None, None) {
        Err(RepositoryError::OptimisticLockFailure {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    // 超出 [0, initial]
    assert!(matches!(
        repo.adjust_quantity("T1", "L1", dec("21"), 1, None, None),
        Err(RepositoryError::FieldValueError { .. })
    ));
    assert!(matches!(
        repo.adjust_quantity("T1", "L1", dec("-1"), 1, None, None),
        Err(RepositoryError::FieldValueError { .. })
    ));

    let txns = repo.list_transactions("T1", "L1").unwrap();
    let adjust = txns.last().unwrap();
    assert_eq!(adjust.txn_type, InventoryTxnType::Adjust);
    assert_eq!(adjust.quantity_delta, dec("-2"));
    assert_eq!(adjust.reference.as_deref(), Some("cycle count"));
}

#[test]
fn test_deactivate_is_idempotent() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("L1", "20", date(1, 1)), None)
        .unwrap();

    repo.deactivate_lot("T1", "L1", None, None).unwrap();
    repo.deactivate_lot("T1", "L1", None, None).unwrap();

    let lot = repo.find_by_id("T1", "L1").unwrap().unwrap();
    assert!(!lot.active);
    assert_eq!(lot.current_quantity, dec("20"));

    let deactivations = repo
        .list_transactions("T1", "L1")
        .unwrap()
        .into_iter()
        .filter(|t| t.txn_type == InventoryTxnType::Deactivate)
        .count();
    assert_eq!(deactivations, 1);

    assert!(matches!(
        repo.deactivate_lot("T1", "missing", None, None),
        Err(RepositoryError::NotFound { .. })
    ));
}

#[test]
fn test_lock_failure_reports_stored_revision_after_split() {
    let repo = setup_test_repo();
    repo.create_lot(&make_test_lot("P1", "50", date(1, 1)), None)
        .unwrap();
    repo.split_lot("T1", "P1", dec("10"), "LN-P1-A", None)
        .unwrap();
    repo.split_lot("T1", "P1", dec("10"), "LN-P1-B", None)
        .unwrap();

    match repo.adjust_quantity("T1", "P1", dec("25"), 0, None, None) {
        Err(RepositoryError::OptimisticLockFailure {
            lot_id,
            expected,
            actual,
        }) => {
            assert_eq!(lot_id, "P1");
            assert_eq!(expected, 0);
            assert_eq!(actual, 2);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

// ==========================================
// 连接与事务错误
// ==========================================

#[test]
fn test_open_failure_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing_dir").join("lots.db");

    match LotRepository::new(path.to_str().unwrap()) {
        Err(RepositoryError::DatabaseConnectionError(msg)) => assert!(msg.contains("lots.db")),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("expected connection error"),
    }
}

#[test]
fn test_write_lock_held_elsewhere_is_transaction_error() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&path).unwrap();
    crate::db::init_schema(&conn).unwrap();
    conn.busy_timeout(std::time::Duration::ZERO).unwrap();
    let repo = LotRepository::from_connection(Arc::new(Mutex::new(conn)));
    repo.create_lot(&make_test_lot("L1", "20", date(1, 1)), None)
        .unwrap();

    let other = Connection::open(&path).unwrap();
    other.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let err = repo
        .adjust_quantity("T1", "L1", dec("10"), 0, None, None)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::DatabaseTransactionError(_)));

    other.execute_batch("ROLLBACK;").unwrap();
    let lot = repo.find_by_id("T1", "L1").unwrap().unwrap();
    assert_eq!(lot.current_quantity, dec("20"));
    assert_eq!(lot.revision, 0);
}
