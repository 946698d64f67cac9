//! Data binding options and init-binder methods.
//!
//! Init-binder methods customise the [`DataBinder`] used for each argument. They are
//! registered globally (advice) or for one controller type, and optionally only for
//! named arguments. The methods applying to a controller type are selected once and
//! cached for the life of the process.

use crate::handler::HandlerMethod;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Binding options for one argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBinder {
    trim_strings: bool,
    empty_as_absent: bool,
    disallowed_fields: BTreeSet<String>,
}

impl DataBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trim textual values; with `empty_as_absent`, a value that trims to nothing
    /// counts as not supplied.
    pub fn trim_strings(&mut self, empty_as_absent: bool) -> &mut Self {
        self.trim_strings = true;
        self.empty_as_absent = empty_as_absent;
        self
    }

    /// Top-level body fields that are dropped before decoding.
    pub fn set_disallowed_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_allowed(&self, field: &str) -> bool {
        !self.disallowed_fields.contains(field)
    }

    /// Apply the textual options; `None` means the value counts as absent.
    pub fn bind_text(&self, raw: &str) -> Option<String> {
        let value = if self.trim_strings { raw.trim() } else { raw };
        if self.empty_as_absent && value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Remove disallowed top-level fields from a JSON object body.
    pub fn bind_json(&self, value: &mut Value) {
        if let Value::Object(fields) = value {
            if !self.disallowed_fields.is_empty() {
                fields.retain(|name, _| self.is_allowed(name));
            }
        }
    }
}

type InitBinderFn = Arc<dyn Fn(&mut DataBinder) + Send + Sync>;

/// A registered init-binder method.
#[derive(Clone)]
pub struct InitBinderMethod {
    /// `None` applies to every controller.
    bean_type: Option<&'static str>,
    /// Empty applies to every argument.
    argument_names: Vec<String>,
    apply: InitBinderFn,
}

impl InitBinderMethod {
    fn applies_to_bean(&self, bean_type: &str) -> bool {
        self.bean_type.is_none_or(|own| own == bean_type)
    }

    fn applies_to_argument(&self, name: &str) -> bool {
        self.argument_names.is_empty() || self.argument_names.iter().any(|n| n == name)
    }
}

impl fmt::Debug for InitBinderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitBinderMethod")
            .field("bean_type", &self.bean_type)
            .field("argument_names", &self.argument_names)
            .finish_non_exhaustive()
    }
}

/// All init-binder methods plus the per-controller selection cache.
///
/// # Example
/// ```
/// use springwheel::binder::InitBinderRegistry;
///
/// struct WidgetController;
///
/// let binders = InitBinderRegistry::new()
///     .advice(|binder| {
///         binder.trim_strings(true);
///     })
///     .controller_for::<WidgetController, _>(["widget"], |binder| {
///         binder.set_disallowed_fields(["id"]);
///     });
/// ```
#[derive(Default)]
pub struct InitBinderRegistry {
    methods: Vec<InitBinderMethod>,
    cache: DashMap<&'static str, Arc<[InitBinderMethod]>>,
}

impl InitBinderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies to every argument of every controller.
    pub fn advice<F>(self, apply: F) -> Self
    where
        F: Fn(&mut DataBinder) + Send + Sync + 'static,
    {
        self.push(None, Vec::new(), apply)
    }

    /// Applies to every argument of controller `C`.
    pub fn controller<C, F>(self, apply: F) -> Self
    where
        C: ?Sized + 'static,
        F: Fn(&mut DataBinder) + Send + Sync + 'static,
    {
        self.push(Some(std::any::type_name::<C>()), Vec::new(), apply)
    }

    /// Applies to the named arguments of controller `C`.
    pub fn controller_for<C, F>(
        self,
        argument_names: impl IntoIterator<Item = impl Into<String>>,
        apply: F,
    ) -> Self
    where
        C: ?Sized + 'static,
        F: Fn(&mut DataBinder) + Send + Sync + 'static,
    {
        let names = argument_names.into_iter().map(Into::into).collect();
        self.push(Some(std::any::type_name::<C>()), names, apply)
    }

    fn push<F>(mut self, bean_type: Option<&'static str>, argument_names: Vec<String>, apply: F) -> Self
    where
        F: Fn(&mut DataBinder) + Send + Sync + 'static,
    {
        self.methods.push(InitBinderMethod {
            bean_type,
            argument_names,
            apply: Arc::new(apply),
        });
        // Registration changes every selection.
        self.cache.clear();
        self
    }

    /// Init-binder methods for `bean_type`, selected on first use and cached.
    pub fn methods_for(&self, bean_type: &'static str) -> Arc<[InitBinderMethod]> {
        if let Some(hit) = self.cache.get(bean_type) {
            return hit.clone();
        }
        let selected: Arc<[InitBinderMethod]> = self
            .methods
            .iter()
            .filter(|method| method.applies_to_bean(bean_type))
            .cloned()
            .collect();
        self.cache.entry(bean_type).or_insert(selected).clone()
    }

    pub fn binder_factory(&self, handler: &HandlerMethod) -> WebDataBinderFactory {
        WebDataBinderFactory {
            methods: self.methods_for(handler.bean_type()),
        }
    }

    /// Number of controller types with a cached selection.
    pub fn cached_selections(&self) -> usize {
        self.cache.len()
    }
}

/// Creates binders for the arguments of one handler.
#[derive(Debug, Clone)]
pub struct WebDataBinderFactory {
    methods: Arc<[InitBinderMethod]>,
}

impl WebDataBinderFactory {
    /// A binder for argument `name`, with matching init-binder methods applied in
    /// registration order.
    pub fn create_binder(&self, name: &str) -> DataBinder {
        let mut binder = DataBinder::new();
        for method in self.methods.iter().filter(|m| m.applies_to_argument(name)) {
            (method.apply)(&mut binder);
        }
        binder
    }
}
