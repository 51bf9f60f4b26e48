use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use uuid::Uuid;

use banking_core::fees::FeeSchedule;
use banking_core::gateway::normalize_msisdn;
use banking_core::models::transaction::{replay_balance, verify_chain};
use banking_core::models::{FeeRule, Transaction, TransactionCategory, TransactionType};

fn fee_schedule() -> FeeSchedule {
    let mut rules = Vec::new();
    for i in 0..20u32 {
        let min = Decimal::from(i * 1000);
        let max = Decimal::from((i + 1) * 1000 - 1);
        rules.push(FeeRule::percentage(
            TransactionCategory::Transfer,
            min,
            max,
            Decimal::ONE,
        ));
    }
    FeeSchedule::new(rules)
}

fn ledger_history(len: usize) -> Vec<Transaction> {
    let account_id = Uuid::new_v4();
    let mut balance = Decimal::from(1_000_000);
    let mut entries = Vec::with_capacity(len);

    for i in 0..len {
        let amount = Decimal::from((i % 97) + 1);
        let ty = if i % 3 == 0 {
            balance += amount;
            TransactionType::Deposit
        } else {
            balance -= amount;
            TransactionType::Withdrawal
        };
        entries.push(Transaction::new(
            account_id,
            ty,
            amount,
            balance,
            format!("TXN-{i:016}"),
            None,
        ));
    }
    entries
}

fn bench_fee_lookup(c: &mut Criterion) {
    let schedule = fee_schedule();
    c.bench_function("fee_lookup", |b| {
        b.iter(|| {
            schedule.fee_for(
                black_box(TransactionCategory::Transfer),
                black_box(Decimal::from(15_500)),
            )
        })
    });
}

fn bench_replay_10k(c: &mut Criterion) {
    let entries = ledger_history(10_000);
    c.bench_function("replay_10k_entries", |b| {
        b.iter(|| replay_balance(black_box(Decimal::from(1_000_000)), black_box(&entries)))
    });
}

fn bench_verify_chain_10k(c: &mut Criterion) {
    let entries = ledger_history(10_000);
    c.bench_function("verify_chain_10k_entries", |b| {
        b.iter(|| verify_chain(black_box(&entries)))
    });
}

fn bench_phone_normalization(c: &mut Criterion) {
    c.bench_function("normalize_msisdn", |b| {
        b.iter(|| normalize_msisdn(black_box("+254 712 345 678")))
    });
}

criterion_group!(
    benches,
    bench_fee_lookup,
    bench_replay_10k,
    bench_verify_chain_10k,
    bench_phone_normalization
);
criterion_main!(benches);
