use crate::{Product, Role, User};
use std::collections::HashMap;

/// Repository the domain operations read from and the executor writes to.
pub trait Catalog: Send {
    fn product(&self, id: &str) -> Option<&Product>;
    /// All products in insertion order.
    fn products(&self) -> &[Product];
    fn upsert_product(&mut self, product: Product);

    fn user(&self, address: &str) -> Option<&User>;
    fn user_by_role(&self, role: Role) -> Option<&User>;
    fn users(&self) -> &[User];
    fn upsert_user(&mut self, user: User);
}

/// A `Vec` of records with a key -> slot index on the side.
#[derive(Debug, Clone)]
struct Indexed<T> {
    items: Vec<T>,
    slots: HashMap<String, usize>,
}

impl<T> Default for Indexed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            slots: HashMap::new(),
        }
    }
}

impl<T> Indexed<T> {
    fn get(&self, key: &str) -> Option<&T> {
        self.slots.get(key).map(|&slot| &self.items[slot])
    }

    fn upsert(&mut self, key: String, item: T) {
        match self.slots.get(&key) {
            Some(&slot) => self.items[slot] = item,
            None => {
                self.slots.insert(key, self.items.len());
                self.items.push(item);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    products: Indexed<Product>,
    users: Indexed<User>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let mut catalog = Self::new();
        for user in users {
            catalog.upsert_user(user);
        }
        catalog
    }
}

impl Catalog for MemoryCatalog {
    fn product(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    fn products(&self) -> &[Product] {
        &self.products.items
    }

    fn upsert_product(&mut self, product: Product) {
        self.products.upsert(product.id.clone(), product);
    }

    fn user(&self, address: &str) -> Option<&User> {
        self.users.get(address)
    }

    fn user_by_role(&self, role: Role) -> Option<&User> {
        self.users.items.iter().find(|u| u.role == role)
    }

    fn users(&self) -> &[User] {
        &self.users.items
    }

    fn upsert_user(&mut self, user: User) {
        self.users.upsert(user.address.clone(), user);
    }
}
