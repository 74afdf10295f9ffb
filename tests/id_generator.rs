use multibuf_table::IdGenerator;

#[test]
fn get_return_reset_cycle() {
    let mut g = IdGenerator::new(0);
    let id = g.get();
    assert!(g.is_returnable(id));
    g.put(id);
    assert!(!g.is_returnable(id));

    let id = g.get();
    let id2 = g.get();
    assert_ne!(id, id2);
    assert!(g.is_returnable(id));
    assert!(g.is_returnable(id2));

    g.reset(0);
    assert!(!g.is_returnable(id));
    assert!(!g.is_returnable(id2));

    let id = g.get();
    let id2 = g.get();
    assert_ne!(id, id2);
    g.put(id2);
    assert!(g.is_returnable(id));
    assert!(!g.is_returnable(id2));
    g.put(id);
    assert!(!g.is_returnable(id));
    assert!(!g.is_returnable(id2));
}

#[test]
fn returned_id_is_reused_first() {
    let mut g = IdGenerator::new(0);
    let a = g.get();
    let b = g.get();
    assert_ne!(a, b);
    g.put(a);
    assert_eq!(g.get(), a);
    assert_eq!(g.get(), 2);
}
