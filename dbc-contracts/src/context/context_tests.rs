//! Tests for call contexts and the context stack

use super::*;

fn clause(holds: bool) -> ClauseResult {
    ClauseResult::new(holds, "derived", "func")
}

#[test]
fn test_new_context_is_clean() {
    let ctx = CallContext::new();
    assert!(ctx.is_clean());
    for kind in ContractKind::ALL {
        assert!(!ctx.flag(kind));
        assert!(ctx.register(kind).is_empty());
    }
}

#[test]
fn test_flags_are_independent() {
    let mut ctx = CallContext::new();
    ctx.set_flag(ContractKind::Invariant, true);

    assert!(ctx.flag(ContractKind::Invariant));
    assert!(!ctx.flag(ContractKind::Precondition));
    assert!(!ctx.flag(ContractKind::Postcondition));
    assert!(ctx.any_flag());

    ctx.set_flag(ContractKind::Invariant, false);
    assert!(!ctx.any_flag());
}

#[test]
fn test_registers_are_independent() {
    let mut ctx = CallContext::new();
    ctx.register_mut(ContractKind::Precondition).push(clause(true));
    ctx.register_mut(ContractKind::Postcondition).push(clause(false));
    ctx.register_mut(ContractKind::Postcondition).push(clause(true));

    assert_eq!(ctx.register(ContractKind::Precondition).len(), 1);
    assert_eq!(ctx.register(ContractKind::Postcondition).len(), 2);
    assert!(ctx.register(ContractKind::Invariant).is_empty());
    assert!(!ctx.is_clean());
}

#[test]
fn test_enter_isolated_installs_fresh_context() {
    let mut stack = ContextStack::new(8);
    stack.active_mut().register_mut(ContractKind::Invariant).push(clause(true));
    stack.active_mut().set_flag(ContractKind::Invariant, true);

    stack.enter_isolated().unwrap();

    assert_eq!(stack.depth(), 1);
    assert!(stack.active().is_clean());
}

#[test]
fn test_leave_isolated_discards_fresh_context() {
    let mut stack = ContextStack::new(8);
    stack.active_mut().snapshots_mut().capture("m_count", 1i32);

    stack.enter_isolated().unwrap();
    stack.active_mut().register_mut(ContractKind::Precondition).push(clause(false));
    stack.active_mut().snapshots_mut().capture("scratch", 2i32);
    stack.leave_isolated().unwrap();

    assert_eq!(stack.depth(), 0);
    assert!(stack.active().register(ContractKind::Precondition).is_empty());
    assert!(stack.active().snapshots().contains("m_count"));
    assert!(!stack.active().snapshots().contains("scratch"));
}

#[test]
fn test_nested_isolation_restores_in_order() {
    let mut stack = ContextStack::new(8);
    stack.active_mut().snapshots_mut().capture("level", 0i32);
    stack.enter_isolated().unwrap();
    stack.active_mut().snapshots_mut().capture("level", 1i32);
    stack.enter_isolated().unwrap();
    stack.active_mut().snapshots_mut().capture("level", 2i32);

    stack.leave_isolated().unwrap();
    assert_eq!(stack.active().snapshots().recall::<i32>("level").unwrap(), 1);
    stack.leave_isolated().unwrap();
    assert_eq!(stack.active().snapshots().recall::<i32>("level").unwrap(), 0);
}

#[test]
fn test_leave_without_enter_underflows() {
    let mut stack = ContextStack::new(8);
    assert!(matches!(stack.leave_isolated(), Err(ContractError::ContextStackUnderflow)));
}

#[test]
fn test_depth_limit() {
    let mut stack = ContextStack::new(2);
    stack.enter_isolated().unwrap();
    stack.enter_isolated().unwrap();

    match stack.enter_isolated() {
        Err(ContractError::IsolationDepthExceeded { depth }) => assert_eq!(depth, 3),
        other => panic!("expected IsolationDepthExceeded, got {:?}", other),
    }
    assert_eq!(stack.depth(), 2);
}

#[test]
fn test_reset() {
    let mut stack = ContextStack::new(8);
    stack.active_mut().set_flag(ContractKind::Postcondition, true);
    stack.enter_isolated().unwrap();
    stack.reset();

    assert!(stack.is_idle());
    assert_eq!(stack.max_depth(), 8);
}
