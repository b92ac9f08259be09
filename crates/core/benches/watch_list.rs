use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

use fintrack_core::{
    Currency, CurrencyValue, Entity, Transaction, TransactionKind, TransactionProps, UserId,
    WatchList,
};

fn transactions(n: usize) -> Vec<Transaction> {
    let user_id = UserId::new();
    (0..n)
        .map(|i| {
            Transaction::new(TransactionProps {
                user_id,
                name: format!("tx-{i}"),
                description: None,
                amount: CurrencyValue::new(Decimal::new(i as i64 + 1, 2), Currency::Usd),
                kind: TransactionKind::GoalContribution,
                category: None,
                occurred_at: Utc::now(),
                recurring: false,
            })
        })
        .collect()
}

fn bench_pending_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("watch_list_pending_changes");
    for size in [10usize, 100, 1_000] {
        let mut list = WatchList::from_items(transactions(size));
        let ids: Vec<_> = list.items().map(|t| *t.id()).collect();
        for id in ids.iter().step_by(3) {
            list.remove(id);
        }
        for tx in transactions(size / 2) {
            let _ = list.add(tx);
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &list, |b, list| {
            b.iter(|| black_box(list.pending_changes()));
        });
    }
    group.finish();
}

fn bench_fold_items(c: &mut Criterion) {
    let list = WatchList::from_items(transactions(1_000));
    c.bench_function("watch_list_fold_1000", |b| {
        b.iter(|| {
            list.items().try_fold(CurrencyValue::zero(Currency::Usd), |acc, tx| {
                acc.add(tx.amount())
            })
        });
    });
}

criterion_group!(benches, bench_pending_changes, bench_fold_items);
criterion_main!(benches);
