//! Method registry.
//!
//! A service type lists its callable methods once, in [`RpcService::register`].
//! [`ServiceRegistry::new`] binds those methods to a receiver instance, keeps the ones
//! that are eligible for remote invocation and indexes them by name.
//!
//! Every method has the shape `(receiver, &RequestContext, &Args, &mut Reply)`
//! returning `Result<(), ServiceError>`; the compiler enforces it. What is left to
//! check at build time is the wire name: only public names (an ASCII uppercase
//! letter followed by ASCII alphanumerics or `_`) are exported.

use std::any::type_name;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::error::{DispatchError, NotFoundError, RegistrationError, ServiceError};
use super::request::RequestContext;

type Invoker = dyn Fn(&RequestContext, Value) -> Result<Value, DispatchError> + Send + Sync;
type UnboundMethod<S> =
    Box<dyn Fn(&S, &RequestContext, Value) -> Result<Value, DispatchError> + Send + Sync>;

/// A type whose methods can be served over RPC.
///
/// ```ignore
/// impl RpcService for Arith {
///     fn register(registrar: &mut Registrar<Self>) {
///         registrar
///             .method("Multiply", Arith::multiply)
///             .method("Divide", Arith::divide);
///     }
/// }
/// ```
pub trait RpcService: Send + Sync + 'static {
    fn register(registrar: &mut Registrar<Self>)
    where
        Self: Sized;
}

/// Collects candidate methods of a service before they are bound to a receiver.
pub struct Registrar<S> {
    candidates: Vec<Candidate<S>>,
}

struct Candidate<S> {
    name: String,
    args_type: &'static str,
    reply_type: &'static str,
    call: UnboundMethod<S>,
}

impl<S: RpcService> Registrar<S> {
    fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// Offer a method for registration under `name`.
    ///
    /// Arguments are decoded into a fresh `A`; the method fills a `R::default()` reply.
    pub fn method<A, R, F>(&mut self, name: &str, method: F) -> &mut Self
    where
        A: DeserializeOwned + 'static,
        R: Serialize + Default + 'static,
        F: Fn(&S, &RequestContext, &A, &mut R) -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        let call = move |receiver: &S,
                         ctx: &RequestContext,
                         raw: Value|
              -> Result<Value, DispatchError> {
            let args: A = serde_json::from_value(raw).map_err(DispatchError::Decode)?;
            let mut reply = R::default();
            method(receiver, ctx, &args, &mut reply)?;
            serde_json::to_value(&reply).map_err(DispatchError::Encode)
        };

        self.candidates.push(Candidate {
            name: name.to_string(),
            args_type: type_name::<A>(),
            reply_type: type_name::<R>(),
            call: Box::new(call),
        });
        self
    }
}

/// One callable method bound to its receiver.
pub struct MethodSpec {
    name: String,
    args_type: &'static str,
    reply_type: &'static str,
    invoker: Box<Invoker>,
}

impl MethodSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args_type(&self) -> &'static str {
        self.args_type
    }

    pub fn reply_type(&self) -> &'static str {
        self.reply_type
    }

    /// Decode `raw` into the argument type, run the method and encode its reply.
    ///
    /// Decode failures surface as [`DispatchError::Decode`] before the method runs.
    pub fn invoke(&self, ctx: &RequestContext, raw: Value) -> Result<Value, DispatchError> {
        (self.invoker)(ctx, raw)
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("args_type", &self.args_type)
            .field("reply_type", &self.reply_type)
            .finish_non_exhaustive()
    }
}

/// The eligible methods of one receiver, indexed by name. Immutable once built.
#[derive(Debug)]
pub struct ServiceRegistry {
    receiver_type: &'static str,
    name: String,
    methods: HashMap<String, Arc<MethodSpec>>,
}

impl ServiceRegistry {
    /// Build the registry for `receiver`.
    ///
    /// With a non-empty `name`, methods are registered as `name.Method`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::NoEligibleMethods`] if no method qualifies.
    pub fn new<S: RpcService>(receiver: Arc<S>, name: &str) -> Result<Self, RegistrationError> {
        let mut registrar = Registrar::new();
        S::register(&mut registrar);

        let mut methods = HashMap::new();
        for candidate in registrar.candidates {
            if !is_public_name(&candidate.name) {
                debug!(
                    receiver = type_name::<S>(),
                    method = %candidate.name,
                    "Skipping method with non-public name"
                );
                continue;
            }

            let full_name = if name.is_empty() {
                candidate.name
            } else {
                format!("{}.{}", name, candidate.name)
            };

            let bound = Arc::clone(&receiver);
            let call = candidate.call;
            let invoker = move |ctx: &RequestContext, raw: Value| call(bound.as_ref(), ctx, raw);

            methods.insert(
                full_name.clone(),
                Arc::new(MethodSpec {
                    name: full_name,
                    args_type: candidate.args_type,
                    reply_type: candidate.reply_type,
                    invoker: Box::new(invoker),
                }),
            );
        }

        if methods.is_empty() {
            return Err(RegistrationError::NoEligibleMethods {
                receiver: type_name::<S>(),
            });
        }

        debug!(
            receiver = type_name::<S>(),
            count = methods.len(),
            "Service registered"
        );

        Ok(Self {
            receiver_type: type_name::<S>(),
            name: name.to_string(),
            methods,
        })
    }

    /// Exact-match lookup.
    pub fn get(&self, name: &str) -> Result<Arc<MethodSpec>, NotFoundError> {
        self.methods
            .get(name)
            .cloned()
            .ok_or_else(|| NotFoundError(name.to_string()))
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn receiver_type(&self) -> &'static str {
        self.receiver_type
    }

    /// Turn an unqualified URL path segment into a registry key.
    ///
    /// Segments that already contain a `.` are taken as-is, as is everything when the
    /// registry was built without a service name.
    pub fn qualify<'a>(&self, segment: &'a str) -> Cow<'a, str> {
        if self.name.is_empty() || segment.contains('.') {
            Cow::Borrowed(segment)
        } else {
            Cow::Owned(format!("{}.{}", self.name, segment))
        }
    }
}

fn is_public_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
