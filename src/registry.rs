/// The fixed product lineup. One entry per showcased drink; keys double as
/// window identifiers and CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductConfig {
    pub key: &'static str,
    pub model_path: &'static str,
    pub scale: f32,
}

pub const PRODUCTS: [ProductConfig; 3] = [
    ProductConfig {
        key: "coke",
        model_path: "assets/models/cola.glb",
        scale: 5.0,
    },
    ProductConfig {
        key: "sprite",
        model_path: "assets/models/sprite.glb",
        scale: 1.0,
    },
    ProductConfig {
        key: "fanta",
        model_path: "assets/models/fanta.glb",
        scale: 13.0,
    },
];

pub fn get(key: &str) -> Option<&'static ProductConfig> {
    PRODUCTS.iter().find(|product| product.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_resolve() {
        let fanta = get("fanta").expect("fanta should be registered");
        assert_eq!(fanta.model_path, "assets/models/fanta.glb");
        assert_eq!(fanta.scale, 13.0);

        assert_eq!(get("coke").unwrap().scale, 5.0);
        assert_eq!(get("sprite").unwrap().scale, 1.0);
    }

    #[test]
    fn unknown_key_is_a_miss() {
        assert!(get("pepsi").is_none());
        assert!(get("").is_none());
    }

    #[test]
    fn keys_are_unique_and_scales_positive() {
        for (i, product) in PRODUCTS.iter().enumerate() {
            assert!(product.scale > 0.0, "{} has non-positive scale", product.key);
            assert!(
                PRODUCTS[i + 1..].iter().all(|other| other.key != product.key),
                "duplicate key {}",
                product.key
            );
        }
    }
}
