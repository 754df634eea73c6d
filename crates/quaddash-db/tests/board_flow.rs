use chrono::{Duration, Utc};
use uuid::Uuid;

use quaddash_db::{Database, StoreError};
use quaddash_types::locations::{DeliveryWindow, DiningHall, Dorm};
use quaddash_types::models::{ChatStatus, Order, OrderStatus};

fn open_order(requester: &str, amount: f64) -> Order {
    Order {
        id: Uuid::new_v4(),
        requester_email: requester.to_string(),
        amount,
        dining_hall: DiningHall::HoustonMarket,
        dorm: Dorm::HarnwellCollegeHouse,
        details: None,
        delivery_window: DeliveryWindow::Asap,
        status: OrderStatus::Open,
        deliverer_email: None,
        created_at: Utc::now(),
    }
}

#[test]
fn post_claim_chat_message_flow() {
    let db = Database::open_in_memory().unwrap();
    let requester = "alice@upenn.edu";
    let deliverer = "bob@seas.upenn.edu";

    let order = open_order(requester, 5.0);
    db.insert_order(&order).unwrap();

    let board = db.list_orders().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].status, OrderStatus::Open);

    let (claimed, chat) = db.claim_order(order.id, deliverer, Utc::now()).unwrap();
    assert_eq!(claimed.status, OrderStatus::Claimed);
    assert_eq!(claimed.deliverer_email.as_deref(), Some(deliverer));

    let board = db.list_orders().unwrap();
    assert!(board.iter().all(|o| o.status != OrderStatus::Open));
    assert_eq!(
        board
            .iter()
            .filter(|o| o.deliverer_email.as_deref() == Some(deliverer))
            .count(),
        1
    );

    // Chat links the two emails and snapshots the order
    assert_eq!(chat.order_id, order.id);
    assert_eq!(chat.requester_email, requester);
    assert_eq!(chat.deliverer_email, deliverer);
    assert_eq!(chat.order_amount, 5.0);
    assert_eq!(chat.status, ChatStatus::Active);
    assert!(db.chats_for_user(requester).unwrap().iter().any(|c| c.id == chat.id));

    db.insert_message(chat.id, deliverer, "on my way", Utc::now())
        .unwrap();

    let messages = db.messages_for_chat(chat.id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "on my way");
    assert_eq!(messages[0].sender_email, deliverer);
}

#[test]
fn cancel_before_claim_leaves_no_chat() {
    let db = Database::open_in_memory().unwrap();
    let requester = "alice@upenn.edu";

    let order = open_order(requester, 4.5);
    db.insert_order(&order).unwrap();
    db.cancel_order(order.id, requester).unwrap();

    assert!(db.list_orders().unwrap().is_empty());
    assert!(db.chats_for_user(requester).unwrap().is_empty());
}

#[test]
fn claim_is_exclusive() {
    let db = Database::open_in_memory().unwrap();
    let order = open_order("alice@upenn.edu", 7.0);
    db.insert_order(&order).unwrap();

    // Requester cannot claim their own order
    assert!(matches!(
        db.claim_order(order.id, "alice@upenn.edu", Utc::now()),
        Err(StoreError::SelfClaim)
    ));

    // First claim by someone else succeeds exactly once
    db.claim_order(order.id, "bob@upenn.edu", Utc::now()).unwrap();

    // A third party loses the race deterministically
    assert!(matches!(
        db.claim_order(order.id, "carol@upenn.edu", Utc::now()),
        Err(StoreError::AlreadyClaimed)
    ));

    // The first deliverer was not overwritten
    let order = db.get_order(order.id).unwrap().unwrap();
    assert_eq!(order.deliverer_email.as_deref(), Some("bob@upenn.edu"));
}

#[test]
fn claim_missing_order_is_not_found() {
    let db = Database::open_in_memory().unwrap();
    assert!(matches!(
        db.claim_order(Uuid::new_v4(), "bob@upenn.edu", Utc::now()),
        Err(StoreError::OrderNotFound)
    ));
}

#[test]
fn only_requester_may_cancel() {
    let db = Database::open_in_memory().unwrap();
    let order = open_order("alice@upenn.edu", 3.0);
    db.insert_order(&order).unwrap();

    assert!(matches!(
        db.cancel_order(order.id, "mallory@upenn.edu"),
        Err(StoreError::NotOwner)
    ));
    assert!(matches!(
        db.cancel_order(Uuid::new_v4(), "alice@upenn.edu"),
        Err(StoreError::OrderNotFound)
    ));

    db.cancel_order(order.id, "alice@upenn.edu").unwrap();
    assert!(db.list_orders().unwrap().is_empty());
}

#[test]
fn messages_come_back_in_created_order() {
    let db = Database::open_in_memory().unwrap();
    let order = open_order("alice@upenn.edu", 6.0);
    db.insert_order(&order).unwrap();
    let (_, chat) = db.claim_order(order.id, "bob@upenn.edu", Utc::now()).unwrap();

    let t0 = Utc::now();
    db.insert_message(chat.id, "bob@upenn.edu", "heading out", t0).unwrap();
    db.insert_message(chat.id, "alice@upenn.edu", "thanks!", t0 + Duration::seconds(1))
        .unwrap();
    // Same timestamp as the first message: insertion order must hold
    db.insert_message(chat.id, "bob@upenn.edu", "at the door", t0 + Duration::seconds(1))
        .unwrap();

    let contents: Vec<_> = db
        .messages_for_chat(chat.id)
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, ["heading out", "thanks!", "at the door"]);
}

#[test]
fn outsiders_cannot_post_into_a_chat() {
    let db = Database::open_in_memory().unwrap();
    let order = open_order("alice@upenn.edu", 6.0);
    db.insert_order(&order).unwrap();
    let (_, chat) = db.claim_order(order.id, "bob@upenn.edu", Utc::now()).unwrap();

    assert!(matches!(
        db.insert_message(chat.id, "mallory@upenn.edu", "hi", Utc::now()),
        Err(StoreError::NotParticipant)
    ));
    assert!(matches!(
        db.insert_message(Uuid::new_v4(), "alice@upenn.edu", "hi", Utc::now()),
        Err(StoreError::ChatNotFound)
    ));
}

#[test]
fn chat_snapshot_survives_order_deletion() {
    let db = Database::open_in_memory().unwrap();
    let order = open_order("alice@upenn.edu", 8.25);
    db.insert_order(&order).unwrap();
    let (_, chat) = db.claim_order(order.id, "bob@upenn.edu", Utc::now()).unwrap();

    // Cancelling a claimed order is allowed in this design
    db.cancel_order(order.id, "alice@upenn.edu").unwrap();

    let kept = db.get_chat(chat.id).unwrap().unwrap();
    assert_eq!(kept.order_amount, 8.25);
    assert_eq!(kept.dining_hall, DiningHall::HoustonMarket);
}
