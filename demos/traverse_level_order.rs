use avl_arena::AvlTreeMap;

fn main() {
    let mut map = AvlTreeMap::new();
    for (key, value) in [(1, "1"), (2, "2"), (3, "3"), (4, "4"), (5, "5"), (6, "6")] {
        map.insert(key, value).unwrap();
    }

    println!("Level-order traversal:");
    map.traverse_level_order(|k, v| {
        println!("Key: {}, Value: {}", k, v);
    });

    println!("Walking successors from the minimum:");
    let mut current = map.minimum();
    while let Some(id) = current {
        let (k, v) = map.key_value(id).unwrap();
        println!("Key: {}, Value: {}, Balance: {}", k, v, map.balance_factor(id).unwrap());
        current = map.successor(id);
    }
}
