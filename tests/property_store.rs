//! End-to-end scenarios from `spec.md` §8.

use proptrie::{Object, StringStore, Value};

fn get_str(obj: &Object, key: &[u8]) -> Option<f64> {
    obj.get(key).map(|v| v.as_number())
}

/// S1 Empty: a fresh object has no properties, `get`/`del` report absence,
/// and iteration yields nothing.
#[test]
fn s1_empty() {
    let mut obj = Object::new();
    assert_eq!(obj.get(b"x"), None);
    assert_eq!(obj.del(b"x"), None);
    assert_eq!(obj.iter().next(), None);
    assert_eq!(obj.len(), 0);
}

/// S2 Single: one property round-trips and iteration visits it exactly once.
#[test]
fn s2_single() {
    let mut obj = Object::new();
    obj.set(b"a", Value::mk_number(1.0)).unwrap();
    assert_eq!(get_str(&obj, b"a"), Some(1.0));
    assert_eq!(obj.len(), 1);

    let store = StringStore::new();
    let mut names: Vec<Vec<u8>> =
        obj.iter().map(|(name, _)| store.get_string(name).unwrap()).collect();
    assert_eq!(names.len(), 1);
    assert_eq!(names.pop().unwrap(), b"a");
}

/// S3 Crit-bit split: "ab" (0x62) vs "ac" (0x63) differ at byte 1, bit 0
/// (`0x62 ^ 0x63 = 0x01`, highest set bit is bit 0). Both keys remain
/// retrievable after the split.
#[test]
fn s3_crit_bit_split() {
    let mut obj = Object::new();
    obj.set(b"ab", Value::mk_number(1.0)).unwrap();
    obj.set(b"ac", Value::mk_number(2.0)).unwrap();

    assert_eq!(get_str(&obj, b"ab"), Some(1.0));
    assert_eq!(get_str(&obj, b"ac"), Some(2.0));
    assert_eq!(obj.len(), 2);
}

/// S4 Prefix: "foo" and "foobar" share a prefix; both are distinguishable
/// and deleting the shorter one leaves the longer one intact.
#[test]
fn s4_prefix() {
    let mut obj = Object::new();
    obj.set(b"foo", Value::mk_number(1.0)).unwrap();
    obj.set(b"foobar", Value::mk_number(2.0)).unwrap();

    assert_eq!(get_str(&obj, b"foo"), Some(1.0));
    assert_eq!(get_str(&obj, b"foobar"), Some(2.0));

    obj.del(b"foo");
    assert_eq!(get_str(&obj, b"foo"), None);
    assert_eq!(get_str(&obj, b"foobar"), Some(2.0));
    assert_eq!(obj.len(), 1);
}

/// S5 Overwrite + delete.
#[test]
fn s5_overwrite_and_delete() {
    let mut obj = Object::new();
    obj.set(b"k", Value::mk_number(1.0)).unwrap();
    let overwrote = obj.set(b"k", Value::mk_number(2.0)).unwrap();
    assert!(overwrote);
    assert_eq!(get_str(&obj, b"k"), Some(2.0));
    assert_eq!(obj.len(), 1);

    assert_eq!(obj.del(b"k"), Some(Value::mk_number(2.0)));
    assert_eq!(get_str(&obj, b"k"), None);
    assert_eq!(obj.len(), 0);
}

/// S6 Prototype: own lookup doesn't see inherited properties, but the
/// bounded prototype walk does, and own properties shadow the prototype's.
#[test]
fn s6_prototype() {
    let mut p = Box::new(Object::new());
    p.set(b"x", Value::mk_number(7.0)).unwrap();
    let p_ptr = std::ptr::NonNull::from(p.as_mut());

    let mut c = Object::new();
    c.set(proptrie::PROTO_PROP_NAME, Value::object_from_ptr(Some(p_ptr)).unwrap())
        .unwrap();

    assert_eq!(c.get_own(b"x"), None);
    assert_eq!(get_str(&c, b"x"), Some(7.0));

    c.set(b"x", Value::mk_number(9.0)).unwrap();
    assert_eq!(get_str(&c, b"x"), Some(9.0));
    assert_eq!(p.get(b"x"), Some(Value::mk_number(7.0)), "prototype's own value is unaffected");

    drop(c);
    drop(p);
}
