//! End-to-end lifecycle tests for the order engine, including the
//! concurrency scenarios the stock invariant exists for.

use std::sync::Arc;

use domain::{AuthClaim, Customer, Money, OrderStatus, Product, Sku};
use engine::{EngineError, ItemRequest, OrderEngine};
use store::{CustomerDirectory, MemoryStore, OrderLedger, ProductStore};
use tokio::sync::Barrier;

async fn setup(stock: i64) -> (Arc<OrderEngine<MemoryStore>>, AuthClaim) {
    let store = MemoryStore::new();
    store
        .insert_product(Product::new(
            "AB-101",
            "Widget",
            "A widget",
            Money::from_cents(2500),
            stock,
        ))
        .await
        .unwrap();
    store
        .insert_customer(Customer::new("Ada", "ada@example.com", "555-0100", "1 Main St"))
        .await
        .unwrap();

    (
        Arc::new(OrderEngine::new(store)),
        AuthClaim::customer("ada@example.com"),
    )
}

fn items(qty: u32) -> Vec<ItemRequest> {
    vec![ItemRequest {
        sku: "AB-101".to_string(),
        qty,
    }]
}

async fn stock(engine: &OrderEngine<MemoryStore>) -> i64 {
    engine
        .store()
        .find_by_sku(&Sku::new("AB-101"))
        .await
        .unwrap()
        .unwrap()
        .stock
}

#[tokio::test]
async fn full_lifecycle_place_pay_fulfill() {
    let (engine, claim) = setup(5).await;
    let admin = AuthClaim::admin("ops@example.com");

    let order = engine.place_order(&claim, &items(2)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(stock(&engine).await, 3);

    let (payment, order) = engine
        .pay_order(&claim, order.id, 50.00, "Credit Card")
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(payment.amount.cents(), 5000);

    let order = engine.fulfill_order(&admin, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Fulfilled);
    assert!(order.fulfilled_at.is_some());
    // Fulfillment does not touch stock.
    assert_eq!(stock(&engine).await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placements_cannot_oversell() {
    // Stock 3, two concurrent requests for 2 each: exactly one succeeds and
    // the final stock is 1.
    let (engine, claim) = setup(3).await;
    let barrier = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = engine.clone();
        let claim = claim.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.place_order(&claim, &items(2)).await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => {
                assert_eq!(order.status, OrderStatus::Pending);
                successes += 1;
            }
            Err(EngineError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert!(available < requested as i64);
                insufficient += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(insufficient, 1);
    assert_eq!(stock(&engine).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stock_never_goes_negative_under_load() {
    let (engine, claim) = setup(10).await;
    let barrier = Arc::new(Barrier::new(8));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let claim = claim.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.place_order(&claim, &items(3)).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            placed += 1;
        }
    }

    // 10 / 3 => at most 3 placements can fit.
    assert_eq!(placed, 3);
    let remaining = stock(&engine).await;
    assert_eq!(remaining, 10 - 3 * placed);
    assert!(remaining >= 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancel_and_fulfill_apply_exactly_once() {
    let (engine, claim) = setup(5).await;
    let admin = AuthClaim::admin("ops@example.com");

    let order = engine.place_order(&claim, &items(2)).await.unwrap();
    engine
        .pay_order(&claim, order.id, 50.00, "Cash")
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let cancel = {
        let engine = engine.clone();
        let admin = admin.clone();
        let barrier = barrier.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            engine.cancel_order(&admin, order.id).await
        })
    };
    let fulfill = {
        let engine = engine.clone();
        let admin = admin.clone();
        let barrier = barrier.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            engine.fulfill_order(&admin, order.id).await
        })
    };

    let cancel = cancel.await.unwrap();
    let fulfill = fulfill.await.unwrap();

    // Exactly one of the two transitions wins the race.
    assert!(cancel.is_ok() ^ fulfill.is_ok());

    let order = engine
        .store()
        .find_order(order.id)
        .await
        .unwrap()
        .unwrap();
    if cancel.is_ok() {
        assert_eq!(order.status, OrderStatus::Cancelled);
        // Cancellation restored the two reserved units.
        assert_eq!(stock(&engine).await, 5);
    } else {
        assert_eq!(order.status, OrderStatus::Fulfilled);
        assert_eq!(stock(&engine).await, 3);
    }
}

#[tokio::test]
async fn double_pay_loses_cleanly() {
    let (engine, claim) = setup(5).await;
    let order = engine.place_order(&claim, &items(1)).await.unwrap();

    engine
        .pay_order(&claim, order.id, 25.00, "Cash")
        .await
        .unwrap();
    let err = engine
        .pay_order(&claim, order.id, 25.00, "Cash")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));

    // Only one payment record exists.
    use store::PaymentRecorder;
    assert_eq!(
        engine
            .store()
            .payments_for_order(order.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn rejected_operations_leave_state_untouched() {
    let (engine, claim) = setup(3).await;

    // Oversized request fails, stock and ledger untouched.
    let err = engine.place_order(&claim, &items(4)).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock { .. }));
    assert_eq!(stock(&engine).await, 3);
    assert_eq!(engine.store().order_count().await, 0);

    // Unknown product fails after another line already validated.
    let err = engine
        .place_order(
            &claim,
            &[
                ItemRequest {
                    sku: "AB-101".to_string(),
                    qty: 1,
                },
                ItemRequest {
                    sku: "ZZ-999".to_string(),
                    qty: 1,
                },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ProductNotFound { .. }));
    assert_eq!(stock(&engine).await, 3);
    assert_eq!(engine.store().order_count().await, 0);
}
