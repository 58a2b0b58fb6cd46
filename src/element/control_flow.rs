use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::{Element, ElementError, ElementKind};
use crate::data::ObservableProperty;

type BuildFn = Rc<RefCell<dyn FnMut() -> Vec<Element>>>;

/// Children produced by a reactive builder instead of manual tree edits.
/// The dirty flag is raised by observable subscriptions and consumed once
/// per frame; builders cache elements by key so an unchanged key keeps its
/// element (and therefore its layout and handlers) across rebuilds.
pub(crate) struct ReactiveChildren {
    pub label: &'static str,
    pub dirty: Rc<Cell<bool>>,
    pub build: BuildFn,
}

impl ReactiveChildren {
    /// The duplicate shares the build closure but starts with a raised
    /// dirty flag and no observable wiring, so it materializes once and
    /// then only changes when reconciled manually.
    pub fn duplicate(&self) -> Self {
        Self {
            label: self.label,
            dirty: Rc::new(Cell::new(true)),
            build: self.build.clone(),
        }
    }
}

/// Shows one of two subtrees depending on `condition`. Each branch is built
/// lazily, once, and kept alive across toggles.
pub fn if_else(
    condition: &ObservableProperty<bool>,
    then_build: impl FnMut() -> Element + 'static,
    else_build: impl FnMut() -> Element + 'static,
) -> Element {
    let dirty = Rc::new(Cell::new(true));
    {
        let dirty = dirty.clone();
        condition.subscribe(move |_| dirty.set(true));
    }
    let condition = condition.clone();
    let mut then_build = then_build;
    let mut else_build = else_build;
    let mut then_cache: Option<Element> = None;
    let mut else_cache: Option<Element> = None;
    let build = move || {
        let branch = if condition.get() {
            then_cache.get_or_insert_with(|| then_build())
        } else {
            else_cache.get_or_insert_with(|| else_build())
        };
        vec![branch.clone()]
    };
    Element::from_kind(ElementKind::Reactive(ReactiveChildren {
        label: "if",
        dirty,
        build: Rc::new(RefCell::new(build)),
    }))
}

/// One child per item, keyed by `key_of`. Items whose key survives a list
/// mutation keep their element; vanished keys drop theirs.
pub fn for_each<T, F>(
    items: &ObservableProperty<Vec<T>>,
    key_of: impl Fn(&T) -> SmolStr + 'static,
    build_item: F,
) -> Element
where
    T: Clone + PartialEq + 'static,
    F: FnMut(&T) -> Element + 'static,
{
    let dirty = Rc::new(Cell::new(true));
    {
        let dirty = dirty.clone();
        items.subscribe(move |_| dirty.set(true));
    }
    let items = items.clone();
    let mut build_item = build_item;
    let mut cache: FxHashMap<SmolStr, Element> = FxHashMap::default();
    let build = move || {
        let current = items.get();
        let mut children = Vec::with_capacity(current.len());
        let mut live_keys = Vec::with_capacity(current.len());
        for item in &current {
            let key = key_of(item);
            let element = cache
                .entry(key.clone())
                .or_insert_with(|| build_item(item))
                .clone();
            live_keys.push(key);
            children.push(element);
        }
        cache.retain(|key, _| live_keys.contains(key));
        children
    };
    Element::from_kind(ElementKind::Reactive(ReactiveChildren {
        label: "for-each",
        dirty,
        build: Rc::new(RefCell::new(build)),
    }))
}

/// Shows the subtree built for the current selector value. Arms are built
/// lazily per key and cached, so flipping back to a previous value restores
/// the same element.
pub fn switch<T, F>(
    selector: &ObservableProperty<T>,
    key_of: impl Fn(&T) -> SmolStr + 'static,
    build_arm: F,
) -> Element
where
    T: Clone + PartialEq + 'static,
    F: FnMut(&T) -> Element + 'static,
{
    let dirty = Rc::new(Cell::new(true));
    {
        let dirty = dirty.clone();
        selector.subscribe(move |_| dirty.set(true));
    }
    let selector = selector.clone();
    let mut build_arm = build_arm;
    let mut cache: FxHashMap<SmolStr, Element> = FxHashMap::default();
    let build = move || {
        let value = selector.get();
        let key = key_of(&value);
        let element = cache
            .entry(key)
            .or_insert_with(|| build_arm(&value))
            .clone();
        vec![element]
    };
    Element::from_kind(ElementKind::Reactive(ReactiveChildren {
        label: "switch",
        dirty,
        build: Rc::new(RefCell::new(build)),
    }))
}

/// Rebuilds the children of one reactive element if its dirty flag is up.
/// Kept children are left wired; removed ones exit the document, new ones
/// enter it through the normal insertion path.
pub(crate) fn reconcile(element: &Element) -> Result<(), ElementError> {
    let build = {
        let node = element.node().borrow();
        match &node.kind {
            ElementKind::Reactive(reactive) if reactive.dirty.replace(false) => {
                reactive.build.clone()
            }
            _ => return Ok(()),
        }
    };
    let desired = (build.borrow_mut())();

    for child in element.children() {
        if !desired.contains(&child) {
            element.remove_child(&child);
        }
    }
    for (index, want) in desired.iter().enumerate() {
        let children = element.children();
        if children.get(index) == Some(want) {
            continue;
        }
        match children.iter().position(|c| c == want) {
            Some(from) => element.move_child(from, index)?,
            None => element.insert_child(index, want)?,
        }
    }
    Ok(())
}

/// Depth-first reconcile pass over the whole tree, run once per frame
/// before layout.
pub(crate) fn reconcile_tree(element: &Element) -> Result<(), ElementError> {
    reconcile(element)?;
    for child in element.children() {
        reconcile_tree(&child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::format_smolstr;

    #[test]
    fn if_else_swaps_branches_on_condition_change() {
        let condition = ObservableProperty::new(true);
        let shown = if_else(&condition, Element::new, Element::new);
        reconcile(&shown).unwrap();
        assert_eq!(shown.child_count(), 1);
        let then_branch = shown.children()[0].clone();

        condition.set(false);
        reconcile(&shown).unwrap();
        let else_branch = shown.children()[0].clone();
        assert_ne!(then_branch, else_branch);

        // Flipping back restores the cached branch element.
        condition.set(true);
        reconcile(&shown).unwrap();
        assert_eq!(shown.children()[0], then_branch);
    }

    #[test]
    fn reconcile_is_a_no_op_while_clean() {
        let condition = ObservableProperty::new(true);
        let shown = if_else(&condition, Element::new, Element::new);
        reconcile(&shown).unwrap();
        let first = shown.children()[0].clone();
        reconcile(&shown).unwrap();
        assert_eq!(shown.children(), vec![first]);
    }

    #[test]
    fn for_each_keeps_elements_for_surviving_keys() {
        let items = ObservableProperty::new(vec![1_u32, 2, 3]);
        let list = for_each(&items, |n| format_smolstr!("{n}"), |_| Element::new());
        reconcile(&list).unwrap();
        let kept = list.children()[1].clone();

        items.set(vec![3, 2]);
        reconcile(&list).unwrap();
        assert_eq!(list.child_count(), 2);
        assert_eq!(list.children()[1], kept);
    }

    #[test]
    fn for_each_drops_elements_for_vanished_keys() {
        let items = ObservableProperty::new(vec![1_u32, 2]);
        let list = for_each(&items, |n| format_smolstr!("{n}"), |_| Element::new());
        reconcile(&list).unwrap();
        let dropped = list.children()[0].clone();

        items.set(vec![2]);
        reconcile(&list).unwrap();
        assert_eq!(list.child_count(), 1);
        assert!(!list.children().contains(&dropped));

        // A reborn key gets a fresh element, not the dropped one.
        items.set(vec![1, 2]);
        reconcile(&list).unwrap();
        assert_ne!(list.children()[0], dropped);
    }

    #[test]
    fn switch_caches_arms_per_key() {
        let selector = ObservableProperty::new(SmolStr::new_static("a"));
        let shown = switch(&selector, |v| v.clone(), |_| Element::new());
        reconcile(&shown).unwrap();
        let arm_a = shown.children()[0].clone();

        selector.set(SmolStr::new_static("b"));
        reconcile(&shown).unwrap();
        assert_ne!(shown.children()[0], arm_a);

        selector.set(SmolStr::new_static("a"));
        reconcile(&shown).unwrap();
        assert_eq!(shown.children()[0], arm_a);
    }
}
