//! Example demonstrating contracts across an override chain
//!
//! Run with `RUST_LOG=debug` to watch the traversals.

use std::rc::Rc;

use dbc_contracts::{engine, CallChain, ContractError, MethodContract};

#[derive(Debug)]
struct Account {
    balance: i64,
    fee: i64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // Base: deposits must be small, never lose money
    let deposit = Rc::new(
        MethodContract::builder("Account", "deposit")
            .invariant_labeled("balance is never negative", |a: &Account| a.balance >= 0)
            .require_labeled("balance below limit", |a: &Account| a.balance < 1_000)
            .old("balance", |a: &Account| a.balance)
            .action(|a: &mut Account| {
                a.balance += 100;
                Ok(())
            })
            .ensure_labeled("balance did not shrink", |a: &Account, olds| {
                Ok(a.balance >= olds.recall::<i64>("balance")?)
            })
            .build(),
    );

    // Override: accepts larger balances (weaker precondition) and charges a fee
    let premium_deposit = Rc::new(
        MethodContract::builder("PremiumAccount", "deposit")
            .extends(Rc::clone(&deposit))
            .require_labeled("balance below premium limit", |a: &Account| a.balance < 10_000)
            .old("balance", |a: &Account| a.balance)
            .action(|a: &mut Account| {
                a.balance += 100 - a.fee;
                Ok(())
            })
            .ensure_labeled("fee taken", |a: &Account, olds| {
                Ok(a.balance == olds.recall::<i64>("balance")? + 100 - a.fee)
            })
            .build(),
    );

    println!("=== Example 1: Weakened precondition ===\n");
    {
        let _chain = CallChain::begin();
        let mut account = Account { balance: 5_000, fee: 10 };
        premium_deposit.call(&mut account)?;
        println!("premium deposit at 5000 accepted, balance now {}", account.balance);

        let mut account = Account { balance: 5_000, fee: 10 };
        match deposit.call(&mut account) {
            Err(ContractError::Violation(violation)) => println!("plain deposit rejected: {}", violation),
            other => println!("unexpected outcome: {:?}", other),
        }
    }

    println!("\n=== Example 2: Inherited postcondition ===\n");
    {
        let _chain = CallChain::begin();
        // a fee above the deposit makes the balance shrink
        let mut account = Account { balance: 100, fee: 150 };
        match premium_deposit.call(&mut account) {
            Err(ContractError::Violation(violation)) => println!("caught: {}", violation),
            other => println!("unexpected outcome: {:?}", other),
        }
        println!("balance after the failed call: {}", account.balance);
    }

    println!("\n=== Example 3: Engine statistics ===\n");
    {
        let _chain = CallChain::begin();
        let mut account = Account { balance: 0, fee: 1 };
        for _ in 0..3 {
            premium_deposit.call(&mut account)?;
        }
        println!("balance: {}", account.balance);
        println!("{}", serde_json::to_string_pretty(&engine::stats())?);
    }

    Ok(())
}
