//! In-memory [`CommerceStore`] for development and tests.
//!
//! All state sits behind one [`Mutex`]. Each mutating operation clones the
//! state, applies its changes to the copy and swaps the copy in only when
//! every step succeeded, so a failure part way through leaves nothing behind.
//!
//! Faults can be injected with [`InMemoryStore::inject_fault`] to exercise
//! those rollback paths.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use atelier_core::cart::{self, AddPlan, Cart, CartLine, LineKey, UpdatePlan};
use atelier_core::catalog::{Category, ConfigurablePart, Product, ProductVariant};
use atelier_core::order::{self, Order, OrderLine};
use atelier_core::{
    CartId, CartLineId, CategoryId, CoreError, OrderId, OrderLineId, OrderStatus, PartId,
    ProductId, VariantId,
};

use super::{
    CommerceStore, NewCartLine, NewCategory, NewPart, NewProduct, NewVariant, PlaceOrder,
    StoreError, StoreResult, validate_new_part, validate_new_product,
};

/// A failure to trigger on the next matching operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail the next cart line mutation before it commits.
    NextCartWrite,
    /// Fail the next order placement after this many order lines were written.
    OrderAfterLines(usize),
}

#[derive(Debug, Clone)]
struct CartRecord {
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    variants: BTreeMap<VariantId, ProductVariant>,
    parts: BTreeMap<PartId, ConfigurablePart>,
    carts: BTreeMap<CartId, CartRecord>,
    lines: BTreeMap<CartLineId, CartLine>,
    orders: BTreeMap<OrderId, Order>,
    last_id: i32,
}

impl MemoryState {
    fn next_id(&mut self) -> Result<i32, StoreError> {
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| StoreError::persistence("id sequence exhausted"))?;
        Ok(self.last_id)
    }

    fn cart_lines(&self, cart_id: CartId) -> Vec<CartLine> {
        self.lines
            .values()
            .filter(|l| l.cart_id == cart_id)
            .cloned()
            .collect()
    }

    fn assemble_cart(&self, cart_id: CartId) -> Option<Cart> {
        self.carts.get(&cart_id).map(|record| Cart {
            id: cart_id,
            version: record.version,
            lines: self.cart_lines(cart_id),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn touch_cart(&mut self, cart_id: CartId, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let record = self
            .carts
            .get_mut(&cart_id)
            .ok_or_else(|| CoreError::not_found(format!("cart {cart_id}")))?;
        record.version += 1;
        record.updated_at = now;
        Ok(record.version)
    }

    fn line_in_cart(&self, cart_id: CartId, line_id: CartLineId) -> Result<&CartLine, StoreError> {
        self.lines
            .get(&line_id)
            .filter(|l| l.cart_id == cart_id)
            .ok_or_else(|| CoreError::not_found(format!("cart line {line_id}")).into())
    }
}

/// Mutex-guarded map store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    fault: Mutex<Option<Fault>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot fault.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Persistence` if the fault lock is poisoned.
    pub fn inject_fault(&self, fault: Fault) -> StoreResult<()> {
        *self
            .fault
            .lock()
            .map_err(|_| StoreError::persistence("fault lock poisoned"))? = Some(fault);
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::persistence("store lock poisoned"))
    }

    /// Consume the armed fault if `matches` accepts it.
    fn take_fault(&self, matches: impl Fn(Fault) -> bool) -> StoreResult<Option<Fault>> {
        let mut slot = self
            .fault
            .lock()
            .map_err(|_| StoreError::persistence("fault lock poisoned"))?;
        let armed = *slot;
        Ok(match armed {
            Some(fault) if matches(fault) => slot.take(),
            _ => None,
        })
    }

    fn fail_cart_write(&self) -> StoreResult<()> {
        if self
            .take_fault(|f| f == Fault::NextCartWrite)?
            .is_some()
        {
            return Err(StoreError::persistence("injected cart write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl CommerceStore for InMemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut state = self.lock()?;
        if state.categories.values().any(|c| c.slug == category.slug) {
            return Err(CoreError::conflict(format!(
                "category slug {} already exists",
                category.slug
            ))
            .into());
        }

        let created = Category {
            id: CategoryId::new(state.next_id()?),
            name: category.name,
            slug: category.slug,
        };
        state.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        validate_new_product(&product)?;

        let mut state = self.lock()?;
        if !state.categories.contains_key(&product.category_id) {
            return Err(CoreError::not_found(format!("category {}", product.category_id)).into());
        }
        if state.products.values().any(|p| p.slug == product.slug) {
            return Err(CoreError::conflict(format!(
                "product slug {} already exists",
                product.slug
            ))
            .into());
        }

        let now = Utc::now();
        let created = Product {
            id: ProductId::new(state.next_id()?),
            category_id: product.category_id,
            name: product.name,
            slug: product.slug,
            base_price: product.base_price,
            base_dimensions: product.base_dimensions,
            is_configurable: product.is_configurable,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_variant(&self, variant: NewVariant) -> StoreResult<ProductVariant> {
        let mut state = self.lock()?;
        if !state.products.contains_key(&variant.product_id) {
            return Err(CoreError::not_found(format!("product {}", variant.product_id)).into());
        }
        if let Some(sku) = &variant.sku
            && state.variants.values().any(|v| v.sku.as_ref() == Some(sku))
        {
            return Err(CoreError::conflict(format!("sku {sku} already exists")).into());
        }

        let created = ProductVariant {
            id: VariantId::new(state.next_id()?),
            product_id: variant.product_id,
            name: variant.name,
            sku: variant.sku,
        };
        state.variants.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_part(&self, part: NewPart) -> StoreResult<ConfigurablePart> {
        validate_new_part(&part)?;

        let mut state = self.lock()?;
        let product = state
            .products
            .get(&part.product_id)
            .ok_or_else(|| CoreError::not_found(format!("product {}", part.product_id)))?;
        if !product.is_configurable {
            return Err(CoreError::validation(format!(
                "product {} is not configurable",
                product.id
            ))
            .into());
        }

        let created = ConfigurablePart {
            id: PartId::new(state.next_id()?),
            product_id: part.product_id,
            kind: part.kind,
            name: part.name.trim().to_owned(),
            price_modifier: part.price_modifier,
        };
        state.parts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    async fn variant(&self, id: VariantId) -> StoreResult<Option<ProductVariant>> {
        Ok(self.lock()?.variants.get(&id).cloned())
    }

    async fn parts(&self, product_id: ProductId) -> StoreResult<Vec<ConfigurablePart>> {
        Ok(self
            .lock()?
            .parts
            .values()
            .filter(|p| p.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn update_product_base_price(
        &self,
        id: ProductId,
        base_price: Decimal,
    ) -> StoreResult<Product> {
        if base_price < Decimal::ZERO {
            return Err(CoreError::validation("base price may not be negative").into());
        }

        let mut state = self.lock()?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("product {id}")))?;
        product.base_price = base_price;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn update_part_price_modifier(
        &self,
        id: PartId,
        price_modifier: Decimal,
    ) -> StoreResult<ConfigurablePart> {
        let mut state = self.lock()?;
        let part = state
            .parts
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("part {id}")))?;
        part.price_modifier = price_modifier;
        Ok(part.clone())
    }

    async fn create_cart(&self) -> StoreResult<Cart> {
        let mut state = self.lock()?;
        let id = CartId::new(state.next_id()?);
        let now = Utc::now();
        state.carts.insert(
            id,
            CartRecord {
                version: 0,
                created_at: now,
                updated_at: now,
            },
        );
        state
            .assemble_cart(id)
            .ok_or_else(|| StoreError::persistence("created cart vanished"))
    }

    async fn cart(&self, id: CartId) -> StoreResult<Option<Cart>> {
        Ok(self.lock()?.assemble_cart(id))
    }

    async fn add_line(&self, cart_id: CartId, line: NewCartLine) -> StoreResult<CartLine> {
        let mut state = self.lock()?;
        let mut staged = state.clone();
        let now = Utc::now();

        staged.touch_cart(cart_id, now)?;
        if !staged.products.contains_key(&line.product_id) {
            return Err(CoreError::not_found(format!("product {}", line.product_id)).into());
        }
        if let Some(variant_id) = line.variant_id
            && !staged.variants.contains_key(&variant_id)
        {
            return Err(CoreError::not_found(format!("variant {variant_id}")).into());
        }

        let key = LineKey::new(line.product_id, line.variant_id, line.configuration.as_ref())?;
        let plan = cart::plan_add(&staged.cart_lines(cart_id), &key, line.quantity)?;

        let result = match plan {
            AddPlan::Increment { line_id, quantity } => {
                let existing = staged
                    .lines
                    .get_mut(&line_id)
                    .ok_or_else(|| StoreError::persistence("planned line vanished"))?;
                existing.quantity = quantity;
                existing.updated_at = now;
                existing.clone()
            }
            AddPlan::Insert { quantity } => {
                let created = CartLine {
                    id: CartLineId::new(staged.next_id()?),
                    cart_id,
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    configuration: line.configuration,
                    quantity,
                    unit_price: line.unit_price,
                    created_at: now,
                    updated_at: now,
                };
                staged.lines.insert(created.id, created.clone());
                created
            }
        };

        self.fail_cart_write()?;
        *state = staged;
        Ok(result)
    }

    async fn update_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: i64,
    ) -> StoreResult<Option<CartLine>> {
        let mut state = self.lock()?;
        let mut staged = state.clone();
        let now = Utc::now();

        staged.touch_cart(cart_id, now)?;
        staged.line_in_cart(cart_id, line_id)?;

        let result = match cart::plan_update(quantity)? {
            UpdatePlan::Remove => {
                staged.lines.remove(&line_id);
                None
            }
            UpdatePlan::SetQuantity(quantity) => {
                let line = staged
                    .lines
                    .get_mut(&line_id)
                    .ok_or_else(|| StoreError::persistence("checked line vanished"))?;
                line.quantity = quantity;
                line.updated_at = now;
                Some(line.clone())
            }
        };

        self.fail_cart_write()?;
        *state = staged;
        Ok(result)
    }

    async fn remove_line(&self, cart_id: CartId, line_id: CartLineId) -> StoreResult<()> {
        let mut state = self.lock()?;
        let mut staged = state.clone();

        staged.touch_cart(cart_id, Utc::now())?;
        staged.line_in_cart(cart_id, line_id)?;
        staged.lines.remove(&line_id);

        self.fail_cart_write()?;
        *state = staged;
        Ok(())
    }

    async fn place_order(&self, cart_id: CartId, request: PlaceOrder) -> StoreResult<Order> {
        let mut state = self.lock()?;
        let mut staged = state.clone();
        let now = Utc::now();

        let current = staged
            .carts
            .get(&cart_id)
            .ok_or_else(|| CoreError::not_found(format!("cart {cart_id}")))?;
        if let Some(expected) = request.expected_cart_version
            && expected != current.version
        {
            return Err(CoreError::conflict(format!(
                "cart {cart_id} changed (expected version {expected}, found {})",
                current.version
            ))
            .into());
        }

        let lines = staged.cart_lines(cart_id);
        for line in &lines {
            if !staged.products.contains_key(&line.product_id) {
                return Err(CoreError::not_found(format!("product {}", line.product_id)).into());
            }
            if let Some(variant_id) = line.variant_id
                && !staged.variants.contains_key(&variant_id)
            {
                return Err(CoreError::not_found(format!("variant {variant_id}")).into());
            }
        }

        let materialized = order::materialize(&lines, request.currency)?;
        let order_id = OrderId::new(staged.next_id()?);
        let fail_after = match self.take_fault(|f| matches!(f, Fault::OrderAfterLines(_)))? {
            Some(Fault::OrderAfterLines(n)) => Some(n),
            _ => None,
        };

        let mut order_lines = Vec::with_capacity(materialized.lines.len());
        for new_line in materialized.lines {
            if fail_after == Some(order_lines.len()) {
                return Err(StoreError::persistence("injected order line failure"));
            }
            order_lines.push(OrderLine {
                id: OrderLineId::new(staged.next_id()?),
                order_id,
                product_id: new_line.product_id,
                variant_id: new_line.variant_id,
                configuration: new_line.configuration,
                quantity: new_line.quantity,
                unit_price: new_line.unit_price,
            });
        }

        let placed = Order {
            id: order_id,
            cart_id,
            status: OrderStatus::Pending,
            currency: request.currency,
            shipping_address: request.shipping_address,
            total: materialized.total,
            lines: order_lines,
            created_at: now,
        };
        staged.orders.insert(order_id, placed.clone());
        staged.lines.retain(|_, l| l.cart_id != cart_id);
        staged.touch_cart(cart_id, now)?;

        *state = staged;
        Ok(placed)
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::order::ShippingAddress;
    use atelier_core::{ConfigurationRecord, CurrencyCode, Dimensions, PartKind};

    use super::*;

    async fn seeded() -> (InMemoryStore, Product) {
        let store = InMemoryStore::new();
        let category = store
            .create_category(NewCategory {
                name: "Sofas".to_owned(),
                slug: "sofas".to_owned(),
            })
            .await
            .unwrap();
        let product = store
            .create_product(NewProduct {
                category_id: category.id,
                name: "Harbor Sofa".to_owned(),
                slug: "harbor-sofa".to_owned(),
                base_price: Decimal::new(129_900, 2),
                base_dimensions: Some(
                    Dimensions::new(Decimal::from(240), Decimal::from(95), Decimal::from(85))
                        .unwrap(),
                ),
                is_configurable: true,
            })
            .await
            .unwrap();
        (store, product)
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            recipient: "Ada Lovelace".to_owned(),
            line1: "12 Workshop Lane".to_owned(),
            line2: None,
            city: "London".to_owned(),
            region: None,
            postal_code: "N1 7GU".to_owned(),
            country_code: "GB".to_owned(),
            phone: None,
        }
    }

    fn request(product_id: ProductId, quantity: i64, price: Decimal) -> NewCartLine {
        NewCartLine {
            product_id,
            variant_id: None,
            configuration: Some(
                ConfigurationRecord::default().with_selection(PartKind::LegType, "Metal"),
            ),
            quantity,
            unit_price: price,
        }
    }

    fn place(expected_cart_version: Option<i64>) -> PlaceOrder {
        PlaceOrder {
            shipping_address: address(),
            expected_cart_version,
            currency: CurrencyCode::USD,
        }
    }

    #[tokio::test]
    async fn test_add_merges_and_keeps_first_price() {
        let (store, product) = seeded().await;
        let cart = store.create_cart().await.unwrap();

        let first = store
            .add_line(cart.id, request(product.id, 1, Decimal::new(134_900, 2)))
            .await
            .unwrap();
        let second = store
            .add_line(cart.id, request(product.id, 2, Decimal::new(999_900, 2)))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 3);
        assert_eq!(second.unit_price, Decimal::new(134_900, 2));

        let cart = store.cart(cart.id).await.unwrap().unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.version, 2);
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let (store, product) = seeded().await;
        let cart = store.create_cart().await.unwrap();
        let line = store
            .add_line(cart.id, request(product.id, 2, Decimal::ONE))
            .await
            .unwrap();

        assert!(store.update_line(cart.id, line.id, 0).await.unwrap().is_none());
        assert!(store.cart(cart.id).await.unwrap().unwrap().lines.is_empty());
    }

    #[tokio::test]
    async fn test_line_of_another_cart_is_not_found() {
        let (store, product) = seeded().await;
        let cart = store.create_cart().await.unwrap();
        let other = store.create_cart().await.unwrap();
        let line = store
            .add_line(cart.id, request(product.id, 1, Decimal::ONE))
            .await
            .unwrap();

        let err = store.remove_line(other.id, line.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_part_requires_configurable_product() {
        let (store, product) = seeded().await;
        let plain = store
            .create_product(NewProduct {
                category_id: product.category_id,
                name: "Stool".to_owned(),
                slug: "stool".to_owned(),
                base_price: Decimal::from(80),
                base_dimensions: None,
                is_configurable: false,
            })
            .await
            .unwrap();

        let err = store
            .create_part(NewPart {
                product_id: plain.id,
                kind: PartKind::Finish,
                name: "Oiled".to_owned(),
                price_modifier: Decimal::from(10),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_place_order_clears_cart() {
        let (store, product) = seeded().await;
        let cart = store.create_cart().await.unwrap();
        store
            .add_line(cart.id, request(product.id, 2, Decimal::new(134_900, 2)))
            .await
            .unwrap();

        let order = store.place_order(cart.id, place(Some(1))).await.unwrap();
        assert_eq!(order.total, Decimal::new(269_800, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.lines.len(), 1);

        let cart = store.cart(cart.id).await.unwrap().unwrap();
        assert!(cart.lines.is_empty());
        assert_eq!(store.order(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_without_mutation() {
        let (store, product) = seeded().await;
        let cart = store.create_cart().await.unwrap();
        store
            .add_line(cart.id, request(product.id, 1, Decimal::ONE))
            .await
            .unwrap();

        let err = store.place_order(cart.id, place(Some(0))).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Conflict(_))));
        assert_eq!(store.cart(cart.id).await.unwrap().unwrap().lines.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_order_failure_rolls_back() {
        let (store, product) = seeded().await;
        let cart = store.create_cart().await.unwrap();
        store
            .add_line(cart.id, request(product.id, 1, Decimal::ONE))
            .await
            .unwrap();
        store
            .add_line(
                cart.id,
                NewCartLine {
                    configuration: None,
                    ..request(product.id, 1, Decimal::TWO)
                },
            )
            .await
            .unwrap();
        let before = store.cart(cart.id).await.unwrap().unwrap();

        store.inject_fault(Fault::OrderAfterLines(1)).unwrap();
        let err = store.place_order(cart.id, place(None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));

        assert_eq!(store.cart(cart.id).await.unwrap().unwrap(), before);
        assert!(store.lock().unwrap().orders.is_empty());
    }

    #[tokio::test]
    async fn test_injected_cart_failure_leaves_cart_untouched() {
        let (store, product) = seeded().await;
        let cart = store.create_cart().await.unwrap();

        store.inject_fault(Fault::NextCartWrite).unwrap();
        let err = store
            .add_line(cart.id, request(product.id, 1, Decimal::ONE))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));

        let cart = store.cart(cart.id).await.unwrap().unwrap();
        assert!(cart.lines.is_empty());
        assert_eq!(cart.version, 0);
    }
}
