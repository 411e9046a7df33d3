use avl_arena::{AvlTreeMap, AvlTreeSet};

fn main() {
    let mut map = AvlTreeMap::new();
    map.insert(0, "zero").unwrap();
    map.insert(1, "one").unwrap();
    map.insert(2, "two").unwrap();
    if let Err(err) = map.insert(2, "deux") {
        println!("rejected {:?}: {}", err.key, err);
    }
    map.insert(3, "three").unwrap();
    map.insert(4, "four").unwrap();
    map.insert(5, "five").unwrap();
    assert_eq!(map.get(&1), Some(&"one"));
    map.remove(&1);
    assert!(map.get(&1).is_none());

    for (k, v) in &map {
        println!("{k} => {v}");
    }
    print!("{}", map.dump());

    let mut set = AvlTreeSet::new();
    for x in 0..5 {
        set.insert(x);
    }
    assert!(set.contains(&1));
    set.remove(&1);
    assert!(!set.contains(&1));

    print!("{{ ");
    for x in &set {
        print!("{x}, ");
    }
    println!("}}");
}
