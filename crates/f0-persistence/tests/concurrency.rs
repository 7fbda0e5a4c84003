//! Escritores concurrentes sobre el mismo archivo.

mod test_support;

use f0_core::money::Money;
use f0_core::rate_for;
use test_support::TempDb;

#[test]
fn concurrent_commissions_see_distinct_prior_totals() {
    let db = TempDb::new(8);
    let engine = db.engine();
    let a = engine.create_account("a@example.com", None).unwrap();
    let threads = 8;
    let per_thread = 25;
    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                for _ in 0..per_thread {
                    engine.record_commission(a.id, 100.0, None).unwrap();
                }
            });
        }
    });

    let events = engine.commissions_for(a.id).unwrap();
    assert_eq!(events.len(), threads * per_thread);
    let mut prior = Money::ZERO;
    for event in &events {
        assert_eq!(event.rate_applied, rate_for(prior), "event {} priced against a stale total", event.id);
        prior = prior + event.amount;
    }
    assert_eq!(engine.stats_for(a.id).unwrap().total_attributed_revenue, Money::from_dollars(20_000));
}

#[test]
fn concurrent_signups_with_same_email_create_one_account() {
    let db = TempDb::new(8);
    let engine = db.engine();
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| engine.create_account("race@example.com", None)))
                                    .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter()
                   .filter_map(|r| r.as_ref().err())
                   .all(|e| *e == f0_core::LedgerError::DuplicateEmail));
}
