#![cfg(feature = "sqlite")]

//! Transaction lifecycle: commit, rollback-on-any-failure, and the
//! drop-while-open safety net, against a file-backed SQLite database.

use sqlpool::prelude::*;
use tempfile::NamedTempFile;

async fn setup() -> (Executor<SqliteDriver>, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    let params = ConnectionParams::for_database(file.path().to_string_lossy().into_owned());
    let config = PoolConfig::new().max_size(2).max_idle(2);
    let pool = Pool::connect(SqliteDriver, params, config).await.unwrap();
    let executor = Executor::new(pool);

    executor
        .exec(
            "CREATE TABLE account (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                balance INTEGER NOT NULL
            )",
            &[],
        )
        .await
        .unwrap();
    for (id, owner, balance) in [(1, "alice", 100), (2, "bob", 50)] {
        executor
            .exec(
                "INSERT INTO account (id, owner, balance) VALUES (?1, ?2, ?3)",
                &[
                    RowValues::Int(id),
                    RowValues::Text(owner.into()),
                    RowValues::Int(balance),
                ],
            )
            .await
            .unwrap();
    }
    (executor, file)
}

async fn balance_of(executor: &Executor<SqliteDriver>, id: i64) -> i64 {
    let row = executor
        .query_one(
            "SELECT balance FROM account WHERE id = ?1",
            &[RowValues::Int(id)],
        )
        .await
        .unwrap()
        .unwrap();
    *row.get("balance").unwrap().as_int().unwrap()
}

/// Debit one account and credit another inside `tx`, failing unless each
/// update touched exactly one row.
async fn transfer(
    tx: &mut Transaction<SqliteDriver>,
    from: i64,
    to: i64,
    amount: i64,
) -> Result<(), SqlPoolError> {
    let debit = tx
        .exec(
            "UPDATE account SET balance = balance - ?1 WHERE id = ?2",
            &[RowValues::Int(amount), RowValues::Int(from)],
        )
        .await?;
    let credit = tx
        .exec(
            "UPDATE account SET balance = balance + ?1 WHERE id = ?2",
            &[RowValues::Int(amount), RowValues::Int(to)],
        )
        .await?;
    if debit.rows_affected != 1 || credit.rows_affected != 1 {
        return Err(SqlPoolError::ExecFailed(
            "transfer must touch exactly one row on each side".into(),
        ));
    }
    Ok(())
}

#[tokio::test]
async fn transaction_commits_when_the_closure_succeeds() {
    let (executor, _file) = setup().await;

    executor
        .transaction(|tx| Box::pin(async move { transfer(tx, 1, 2, 30).await }))
        .await
        .unwrap();

    assert_eq!(balance_of(&executor, 1).await, 70);
    assert_eq!(balance_of(&executor, 2).await, 80);
}

#[tokio::test]
async fn transaction_rolls_back_every_step_on_failure() {
    let (executor, _file) = setup().await;

    // Account 99 does not exist, so the credit touches zero rows. The debit
    // already ran inside the same transaction and must be undone with it.
    let result = executor
        .transaction(|tx| Box::pin(async move { transfer(tx, 1, 99, 30).await }))
        .await;

    assert!(matches!(result, Err(SqlPoolError::ExecFailed(_))));
    assert_eq!(balance_of(&executor, 1).await, 100);
    assert_eq!(balance_of(&executor, 2).await, 50);
}

#[tokio::test]
async fn transaction_returns_the_closure_value() {
    let (executor, _file) = setup().await;

    let new_balance = executor
        .transaction(|tx| {
            Box::pin(async move {
                transfer(tx, 1, 2, 10).await?;
                let row = tx
                    .query_one(
                        "SELECT balance FROM account WHERE id = ?1",
                        &[RowValues::Int(2)],
                    )
                    .await?
                    .ok_or_else(|| SqlPoolError::QueryFailed("account vanished".into()))?;
                Ok(*row.get("balance").unwrap().as_int().unwrap())
            })
        })
        .await
        .unwrap();

    assert_eq!(new_balance, 60);
}

#[tokio::test]
async fn explicit_commit_persists_changes() {
    let (executor, _file) = setup().await;

    let mut tx = executor.begin().await.unwrap();
    tx.exec(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        &[RowValues::Int(7), RowValues::Int(1)],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(balance_of(&executor, 1).await, 7);
}

#[tokio::test]
async fn explicit_rollback_discards_changes() {
    let (executor, _file) = setup().await;

    let mut tx = executor.begin().await.unwrap();
    tx.exec(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        &[RowValues::Int(7), RowValues::Int(1)],
    )
    .await
    .unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(balance_of(&executor, 1).await, 100);
}

#[tokio::test]
async fn queries_inside_a_transaction_see_its_writes() {
    let (executor, _file) = setup().await;

    let mut tx = executor.begin().await.unwrap();
    tx.exec(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        &[RowValues::Int(123), RowValues::Int(1)],
    )
    .await
    .unwrap();

    let row = tx
        .query_one(
            "SELECT balance FROM account WHERE id = ?1",
            &[RowValues::Int(1)],
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("balance").unwrap().as_int(), Some(&123));
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn dropping_an_open_transaction_discards_its_writes() {
    let (executor, _file) = setup().await;

    let mut tx = executor.begin().await.unwrap();
    tx.exec(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        &[RowValues::Int(999), RowValues::Int(1)],
    )
    .await
    .unwrap();
    // Never resolved: the connection is discarded, and closing a SQLite
    // connection rolls back its open transaction.
    drop(tx);

    assert_eq!(balance_of(&executor, 1).await, 100);
    // The discarded connection did not leak pool capacity.
    assert!(executor.pool().status().total <= 2);
}

#[tokio::test]
async fn begin_after_close_reports_begin_failed() {
    let (executor, _file) = setup().await;

    executor.pool().close();
    let result = executor.begin().await;
    assert!(matches!(result, Err(SqlPoolError::BeginFailed(_))));
}
