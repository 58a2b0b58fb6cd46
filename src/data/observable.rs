use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle returned by [`ObservableProperty::subscribe`].
    pub struct SubscriptionKey;
}

type Subscriber<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Inner<T> {
    value: T,
    subscribers: SlotMap<SubscriptionKey, Subscriber<T>>,
    partners: Vec<Weak<RefCell<Inner<T>>>>,
}

/// A reactive value cell with change notification and binding.
///
/// Cloning the property clones a handle to the same cell. Writes that leave
/// the value unchanged never notify; that guard is also what terminates
/// propagation across bound partners.
pub struct ObservableProperty<T: Clone + PartialEq + 'static> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T: Clone + PartialEq + 'static> Clone for ObservableProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> ObservableProperty<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value: initial,
                subscribers: SlotMap::with_key(),
                partners: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Stores `value` and notifies subscribers, then bound partners. A write
    /// equal to the current value is a no-op.
    pub fn set(&self, value: T) {
        if self.inner.borrow().value == value {
            return;
        }
        self.inner.borrow_mut().value = value.clone();

        // Subscribers are cloned out of the borrow so a callback may touch
        // this property again without panicking the RefCell. A handler that
        // is already executing is skipped on re-entrant writes.
        let subscribers: Vec<Subscriber<T>> =
            self.inner.borrow().subscribers.values().cloned().collect();
        for subscriber in subscribers {
            if let Ok(mut handler) = subscriber.try_borrow_mut() {
                handler(&value);
            }
        }

        let partners = self.inner.borrow().partners.clone();
        let mut dropped_partner = false;
        for weak in partners {
            match weak.upgrade() {
                Some(partner) if !Rc::ptr_eq(&partner, &self.inner) => {
                    Self { inner: partner }.set(value.clone());
                }
                Some(_) => {}
                None => dropped_partner = true,
            }
        }
        if dropped_partner {
            self.inner
                .borrow_mut()
                .partners
                .retain(|weak| weak.strong_count() > 0);
        }
    }

    /// Clones the current value, lets `updater` mutate it, then goes through
    /// [`set`](Self::set) (including its equality guard).
    pub fn update(&self, updater: impl FnOnce(&mut T)) {
        let mut value = self.get();
        updater(&mut value);
        self.set(value);
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionKey
    where
        F: FnMut(&T) + 'static,
    {
        self.inner
            .borrow_mut()
            .subscribers
            .insert(Rc::new(RefCell::new(handler)))
    }

    pub fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        self.inner.borrow_mut().subscribers.remove(key).is_some()
    }

    /// Links both properties so a write to either updates the other, then
    /// pushes `self`'s current value into `other`. Partners are held weakly.
    pub fn bind_bidirectional(&self, other: &Self) {
        self.add_partner(other);
        other.add_partner(self);
        other.set(self.get());
    }

    /// One-way link: writes to `self` propagate into `follower`, which is
    /// immediately synced to the current value.
    pub fn bind_to(&self, follower: &Self) {
        self.add_partner(follower);
        follower.set(self.get());
    }

    /// Removes any binding between the two properties, in both directions.
    pub fn unbind(&self, other: &Self) {
        self.remove_partner(other);
        other.remove_partner(self);
    }

    fn add_partner(&self, partner: &Self) {
        let mut inner = self.inner.borrow_mut();
        let already_linked = inner
            .partners
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|rc| Rc::ptr_eq(&rc, &partner.inner)));
        if !already_linked {
            inner.partners.push(Rc::downgrade(&partner.inner));
        }
    }

    fn remove_partner(&self, partner: &Self) {
        self.inner.borrow_mut().partners.retain(|weak| {
            weak.upgrade()
                .is_some_and(|rc| !Rc::ptr_eq(&rc, &partner.inner))
        });
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for ObservableProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for ObservableProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableProperty")
            .field("value", &self.inner.borrow().value)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> PartialEq for ObservableProperty<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn equal_set_does_not_notify() {
        let prop = ObservableProperty::new(3_i32);
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        prop.subscribe(move |_| counter.set(counter.get() + 1));

        prop.set(3);
        assert_eq!(fired.get(), 0);

        prop.set(4);
        assert_eq!(fired.get(), 1);
        prop.set(4);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn subscribers_fire_in_subscription_order() {
        let prop = ObservableProperty::new(0_i32);
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let order = order.clone();
            prop.subscribe(move |_| order.borrow_mut().push(tag));
        }
        prop.set(1);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let prop = ObservableProperty::new(0_i32);
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let key = prop.subscribe(move |_| counter.set(counter.get() + 1));

        prop.set(1);
        assert!(prop.unsubscribe(key));
        assert!(!prop.unsubscribe(key));
        prop.set(2);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn bidirectional_binding_syncs_both_ways() {
        let a = ObservableProperty::new(1_i32);
        let b = ObservableProperty::new(2_i32);
        a.bind_bidirectional(&b);
        assert_eq!(b.get(), 1);

        a.set(10);
        assert_eq!(b.get(), 10);
        b.set(20);
        assert_eq!(a.get(), 20);
    }

    #[test]
    fn binding_does_not_loop() {
        let a = ObservableProperty::new(0_i32);
        let b = ObservableProperty::new(0_i32);
        a.bind_bidirectional(&b);

        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        a.subscribe(move |_| counter.set(counter.get() + 1));

        a.set(5);
        assert_eq!(fired.get(), 1);
        assert_eq!(b.get(), 5);
    }

    #[test]
    fn one_way_binding_only_follows_the_source() {
        let source = ObservableProperty::new(1_i32);
        let follower = ObservableProperty::new(0_i32);
        source.bind_to(&follower);
        assert_eq!(follower.get(), 1);

        source.set(2);
        assert_eq!(follower.get(), 2);
        follower.set(9);
        assert_eq!(source.get(), 2);
    }

    #[test]
    fn dropped_partner_is_skipped() {
        let a = ObservableProperty::new(0_i32);
        {
            let b = ObservableProperty::new(0_i32);
            a.bind_bidirectional(&b);
        }
        a.set(7);
        assert_eq!(a.get(), 7);
    }

    #[test]
    fn reentrant_set_from_subscriber_terminates() {
        let prop = ObservableProperty::new(0_i32);
        let handle = prop.clone();
        prop.subscribe(move |value| {
            if *value < 3 {
                handle.set(value + 1);
            }
        });
        // The in-flight handler is not re-invoked for its own write; the
        // value still lands and no loop or panic occurs.
        prop.set(1);
        assert_eq!(prop.get(), 2);
    }

    #[test]
    fn unbind_severs_the_link() {
        let a = ObservableProperty::new(0_i32);
        let b = ObservableProperty::new(0_i32);
        a.bind_bidirectional(&b);
        a.unbind(&b);

        a.set(4);
        assert_eq!(b.get(), 0);
        b.set(9);
        assert_eq!(a.get(), 4);
    }
}
