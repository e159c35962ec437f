//! Redis cart store integration tests
//!
//! These tests need Docker. Run with:
//!
//! ```bash
//! cargo test -p cart --test redis_integration -- --ignored
//! ```

use cart::{CartStore, RedisCartStore};
use common::{SkuId, UserId};
use redis::AsyncCommands;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;

async fn start() -> (ContainerAsync<Redis>, RedisCartStore, String) {
    let container = Redis::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    let url = format!("redis://{}:{}", host, port);

    let store = RedisCartStore::connect(&url).await.unwrap();
    (container, store, url)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_hash_round_trip() {
    let (_container, store, _) = start().await;
    let user = UserId::new(7);

    store.ping().await.unwrap();
    store.set_quantity(user, SkuId::new(3), 2).await.unwrap();
    store.set_quantity(user, SkuId::new(1), 5).await.unwrap();
    store.set_quantity(user, SkuId::new(3), 4).await.unwrap();

    assert_eq!(store.quantity(user, SkuId::new(3)).await.unwrap(), Some(4));
    assert_eq!(store.distinct_items(user).await.unwrap(), 2);
    assert_eq!(
        store.entries(user).await.unwrap(),
        vec![(SkuId::new(1), 5), (SkuId::new(3), 4)]
    );

    store.remove(user, &[SkuId::new(1), SkuId::new(9)]).await.unwrap();
    assert_eq!(store.entries(user).await.unwrap(), vec![(SkuId::new(3), 4)]);

    store.remove(user, &[]).await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_unparsable_values_are_skipped_and_pruned() {
    let (_container, store, url) = start().await;
    let user = UserId::new(8);

    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let _: () = conn.hset("cart_8", "2", "lots").await.unwrap();
    let _: () = conn.hset("cart_8", "x", "1").await.unwrap();
    let _: () = conn.hset("cart_8", "4", "3").await.unwrap();

    assert_eq!(store.quantity(user, SkuId::new(2)).await.unwrap(), None);
    assert_eq!(store.entries(user).await.unwrap(), vec![(SkuId::new(4), 3)]);

    let left: usize = conn.hlen("cart_8").await.unwrap();
    assert_eq!(left, 1);
    assert_eq!(store.distinct_items(user).await.unwrap(), 1);
}
