use statecraft::prelude::*;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum State {
    Root,
    A,
    B,
    C,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum Event {
    Go,
}

fn depth(core: &MachineCore<State, Event>, state: State) -> usize {
    core.graph().state(state).unwrap().depth()
}

#[test]
fn depths_follow_the_parent_chain_after_every_mutation() {
    let mut core = MachineCore::<State, Event>::new("depths");
    core.hierarchy(State::A)
        .with_initial_sub_state(State::B)
        .unwrap();
    assert_eq!(depth(&core, State::A), 1);
    assert_eq!(depth(&core, State::B), 2);

    // Re-rooting A recomputes the depth of its whole subtree.
    core.hierarchy(State::Root).with_sub_state(State::A).unwrap();
    assert_eq!(depth(&core, State::Root), 1);
    assert_eq!(depth(&core, State::A), 2);
    assert_eq!(depth(&core, State::B), 3);

    core.hierarchy(State::B).with_sub_state(State::C).unwrap();
    assert_eq!(depth(&core, State::C), 4);
}

#[test]
fn a_state_cannot_be_its_own_parent() {
    let mut core = MachineCore::<State, Event>::new("config");
    let result = core.hierarchy(State::A).with_sub_state(State::A);
    assert!(matches!(result, Err(StateMachineError::SelfParent(State::A))));
}

#[test]
fn a_state_has_at_most_one_parent() {
    let mut core = MachineCore::<State, Event>::new("config");
    core.hierarchy(State::A).with_sub_state(State::C).unwrap();
    let result = core.hierarchy(State::B).with_sub_state(State::C);
    assert!(matches!(
        result,
        Err(StateMachineError::AlreadyHasParent {
            child: State::C,
            parent: State::A,
        })
    ));
}

#[test]
fn linking_an_ancestor_as_child_is_rejected() {
    let mut core = MachineCore::<State, Event>::new("config");
    core.hierarchy(State::A).with_sub_state(State::B).unwrap();
    core.hierarchy(State::B).with_sub_state(State::C).unwrap();
    let result = core.hierarchy(State::C).with_sub_state(State::A);
    assert!(matches!(
        result,
        Err(StateMachineError::HierarchyCycle {
            parent: State::C,
            child: State::A,
        })
    ));
}

#[test]
fn the_initial_sub_state_must_be_a_direct_child() {
    use statecraft::StateGraph;

    let mut graph = StateGraph::<State, Event>::new();
    graph.set_parent(State::B, State::A).unwrap();
    graph.set_parent(State::C, State::B).unwrap();

    // C is a grandchild of A.
    let result = graph.set_initial_child(State::A, State::C);
    assert!(matches!(
        result,
        Err(StateMachineError::NotADirectChild {
            parent: State::A,
            child: State::C,
        })
    ));
}

#[test]
fn at_most_one_initial_sub_state() {
    let mut core = MachineCore::<State, Event>::new("config");
    core.hierarchy(State::A)
        .with_initial_sub_state(State::B)
        .unwrap();
    let result = core.hierarchy(State::A).with_initial_sub_state(State::C);
    assert!(matches!(
        result,
        Err(StateMachineError::InitialChildAlreadySet {
            parent: State::A,
            existing: State::B,
        })
    ));
}

#[test]
fn initialize_twice_fails() {
    let mut core = MachineCore::<State, Event>::new("lifecycle");
    core.initialize(State::A).unwrap();
    assert!(matches!(
        core.initialize(State::B),
        Err(StateMachineError::AlreadyInitialized)
    ));
}

#[test]
fn entering_the_initial_state_requires_initialization() {
    let mut core = MachineCore::<State, Event>::new("lifecycle");
    assert!(matches!(
        core.enter_initial_state(),
        Err(StateMachineError::NotInitialized)
    ));
}

#[test]
fn the_initial_state_is_entered_only_once() {
    let mut core = MachineCore::<State, Event>::new("lifecycle");
    core.initialize(State::A).unwrap();
    core.enter_initial_state().unwrap();
    assert!(matches!(
        core.enter_initial_state(),
        Err(StateMachineError::InitialStateAlreadyEntered)
    ));
}

#[test]
fn firing_requires_the_initial_state() {
    let mut core = MachineCore::<State, Event>::new("lifecycle");
    assert!(matches!(
        core.fire(Event::Go, None),
        Err(StateMachineError::NotInitialized)
    ));

    core.initialize(State::A).unwrap();
    assert!(matches!(
        core.fire(Event::Go, None),
        Err(StateMachineError::InitialStateNotEntered)
    ));
}
