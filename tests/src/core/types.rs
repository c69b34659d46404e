use mipsjit_core::types::RegSet;

macro_rules! regset_set_contains_tests {
    ($( $name:ident: $reg:expr, )+ $(,)?) => {
        $(
            #[test]
            fn $name() {
                let reg: u8 = $reg;
                let s = RegSet::EMPTY.set(reg);
                assert!(s.contains(reg));
                assert_eq!(s.count(), 1);
                assert_eq!(s.first(), Some(reg));
            }
        )+
    };
}

regset_set_contains_tests! {
    regset_set_contains_0: 0,
    regset_set_contains_5: 5,
    regset_set_contains_15: 15,
    regset_set_contains_31: 31,
    regset_set_contains_35: 35,
    regset_set_contains_63: 63,
}

#[test]
fn regset_clear_keeps_neighbours() {
    let s = RegSet::EMPTY.set(4).set(5);
    let c = s.clear(4);
    assert!(!c.contains(4));
    assert!(c.contains(5));
    assert_eq!(c.count(), 1);
}

#[test]
fn regset_set_ops() {
    let a = RegSet::EMPTY.set(1).set(2);
    let b = RegSet::EMPTY.set(2).set(3);
    assert_eq!(a.union(b).count(), 3);
    assert_eq!(a.intersect(b), RegSet::EMPTY.set(2));
    assert_eq!(a.subtract(b), RegSet::EMPTY.set(1));
    assert!(RegSet::new().is_empty());
    assert_eq!(RegSet::default(), RegSet::EMPTY);
}

#[test]
fn regset_iter_ascending() {
    let s: RegSet = [13u8, 5, 8, 35].into_iter().collect();
    let regs: Vec<u8> = s.iter().collect();
    assert_eq!(regs, vec![5, 8, 13, 35]);
    assert_eq!(RegSet::EMPTY.iter().count(), 0);
}

#[test]
fn regset_debug_format() {
    assert_eq!(format!("{:?}", RegSet::from_raw(0x30)), "RegSet(0x0000000000000030)");
}
