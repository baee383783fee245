//! Handler signatures.
//!
//! Any `Fn(A0, .., An) -> R` with `Ai: Param` and `R: Replies` is a
//! handler. Its shape (parameter kinds and return slot kinds) is read once
//! when a route is compiled; at request time the handler is called through
//! the type-erased [`ErasedHandler`].
//!
//! # Parameters
//! - scalars (`String`, `bool`, integers, floats) can be bound to the path
//!   or to the body
//! - [`Json<T>`] is structured and can only be bound to the body
//!
//! # Returns
//! - body values ([`Reply`] with [`ReplyKind::Body`])
//! - [`Fault`], the error slot
//! - `()`, a single reply, a tuple of replies, `Result<T, E>` or
//!   `Result<(), E>`

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BoxError;
use crate::routing::scalar::{self, FloatWidth, IntWidth, Scalar, ScalarError, ScalarKind};

/// Declared kind of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Scalar(ScalarKind),
    /// Structured type, named for diagnostics.
    Structured(&'static str),
}

impl std::fmt::Display for ArgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgKind::Scalar(kind) => write!(f, "{}", kind),
            ArgKind::Structured(name) => f.write_str(name),
        }
    }
}

/// Where a parameter value comes from for one invocation.
#[derive(Debug, Clone, Copy)]
pub enum ArgInput<'a> {
    Path(&'a str),
    Body(&'a [u8]),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Scalar(#[from] ScalarError),

    #[error("invalid body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("{0} cannot be bound to a path segment")]
    Structured(&'static str),

    #[error("converted value does not fit {0}")]
    Narrowing(ScalarKind),

    #[error("missing argument {0}")]
    Missing(usize),
}

/// A value a handler parameter can be decoded into.
pub trait Param: Sized + Send + 'static {
    fn kind() -> ArgKind;

    fn decode(input: ArgInput<'_>) -> Result<Self, DecodeError>;
}

/// Scalar parameter types.
pub trait PathScalar: DeserializeOwned + Send + 'static {
    const KIND: ScalarKind;

    fn from_scalar(value: Scalar) -> Option<Self>;
}

impl<T: PathScalar> Param for T {
    fn kind() -> ArgKind {
        ArgKind::Scalar(T::KIND)
    }

    fn decode(input: ArgInput<'_>) -> Result<Self, DecodeError> {
        match input {
            ArgInput::Path(raw) => {
                let value = scalar::convert(T::KIND, raw)?;
                T::from_scalar(value).ok_or(DecodeError::Narrowing(T::KIND))
            }
            ArgInput::Body(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

impl PathScalar for String {
    const KIND: ScalarKind = ScalarKind::Str;

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PathScalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Bool(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! path_scalar_int {
    ($($ty:ty => $variant:ident($width:expr), $scalar:ident;)*) => {
        $(
            impl PathScalar for $ty {
                const KIND: ScalarKind = ScalarKind::$variant($width);

                fn from_scalar(value: Scalar) -> Option<Self> {
                    match value {
                        Scalar::$scalar(v) => <$ty>::try_from(v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

path_scalar_int! {
    i8 => Int(IntWidth::W8), Int;
    i16 => Int(IntWidth::W16), Int;
    i32 => Int(IntWidth::W32), Int;
    i64 => Int(IntWidth::W64), Int;
    isize => Int(IntWidth::Size), Int;
    u8 => Uint(IntWidth::W8), Uint;
    u16 => Uint(IntWidth::W16), Uint;
    u32 => Uint(IntWidth::W32), Uint;
    u64 => Uint(IntWidth::W64), Uint;
    usize => Uint(IntWidth::Size), Uint;
}

impl PathScalar for f32 {
    const KIND: ScalarKind = ScalarKind::Float(FloatWidth::W32);

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Float(f) => Some(f as f32),
            _ => None,
        }
    }
}

impl PathScalar for f64 {
    const KIND: ScalarKind = ScalarKind::Float(FloatWidth::W64);

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Float(f) => Some(f),
            _ => None,
        }
    }
}

/// Structured JSON value, used as the body parameter or a body return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> Param for Json<T> {
    fn kind() -> ArgKind {
        ArgKind::Structured(std::any::type_name::<T>())
    }

    fn decode(input: ArgInput<'_>) -> Result<Self, DecodeError> {
        match input {
            ArgInput::Path(_) => Err(DecodeError::Structured(std::any::type_name::<T>())),
            ArgInput::Body(bytes) => Ok(Json(serde_json::from_slice(bytes)?)),
        }
    }
}

/// Classification of a return slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Body,
    Error,
}

type Encoder = Box<dyn FnOnce() -> serde_json::Result<Vec<u8>> + Send>;

/// One produced return value, ready for inspection by the invocation engine.
pub enum Slot {
    Body { empty: bool, encode: Encoder },
    Error(Option<BoxError>),
}

impl Slot {
    fn body<T: Serialize + Send + 'static>(value: T, empty: bool) -> Self {
        Slot::Body {
            empty,
            encode: Box::new(move || serde_json::to_vec(&value)),
        }
    }

    /// Placeholder for a body slot with no value.
    fn absent() -> Self {
        Slot::Body {
            empty: true,
            encode: Box::new(|| Ok(Vec::new())),
        }
    }
}

/// A single handler return value.
pub trait Reply: Send + 'static {
    const KIND: ReplyKind;

    fn into_slot(self) -> Slot;
}

/// The error-typed return slot. `Fault::none()` is a nil error.
#[derive(Debug, Default)]
pub struct Fault(pub Option<BoxError>);

impl Fault {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(Some(err.into()))
    }
}

impl Reply for Fault {
    const KIND: ReplyKind = ReplyKind::Error;

    fn into_slot(self) -> Slot {
        Slot::Error(self.0)
    }
}

macro_rules! reply_never_empty {
    ($($ty:ty),*) => {
        $(
            impl Reply for $ty {
                const KIND: ReplyKind = ReplyKind::Body;

                fn into_slot(self) -> Slot {
                    Slot::body(self, false)
                }
            }
        )*
    };
}

reply_never_empty!(bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Reply for String {
    const KIND: ReplyKind = ReplyKind::Body;

    fn into_slot(self) -> Slot {
        let empty = self.is_empty();
        Slot::body(self, empty)
    }
}

impl<T: Serialize + Send + 'static> Reply for Json<T> {
    const KIND: ReplyKind = ReplyKind::Body;

    fn into_slot(self) -> Slot {
        Slot::body(self.0, false)
    }
}

impl<T: Serialize + Send + 'static> Reply for Option<T> {
    const KIND: ReplyKind = ReplyKind::Body;

    fn into_slot(self) -> Slot {
        match self {
            Some(value) => Slot::body(value, false),
            None => Slot::absent(),
        }
    }
}

impl<T: Serialize + Send + 'static> Reply for Vec<T> {
    const KIND: ReplyKind = ReplyKind::Body;

    fn into_slot(self) -> Slot {
        let empty = self.is_empty();
        Slot::body(self, empty)
    }
}

impl<K, V> Reply for HashMap<K, V>
where
    K: Serialize + Send + 'static,
    V: Serialize + Send + 'static,
{
    const KIND: ReplyKind = ReplyKind::Body;

    fn into_slot(self) -> Slot {
        let empty = self.is_empty();
        Slot::body(self, empty)
    }
}

impl<K, V> Reply for BTreeMap<K, V>
where
    K: Serialize + Send + 'static,
    V: Serialize + Send + 'static,
{
    const KIND: ReplyKind = ReplyKind::Body;

    fn into_slot(self) -> Slot {
        let empty = self.is_empty();
        Slot::body(self, empty)
    }
}

impl Reply for serde_json::Value {
    const KIND: ReplyKind = ReplyKind::Body;

    fn into_slot(self) -> Slot {
        let empty = match &self {
            serde_json::Value::Null => true,
            serde_json::Value::String(s) => s.is_empty(),
            serde_json::Value::Array(a) => a.is_empty(),
            serde_json::Value::Object(o) => o.is_empty(),
            _ => false,
        };
        Slot::body(self, empty)
    }
}

/// The full return shape of a handler.
pub trait Replies: Send + 'static {
    fn kinds() -> Vec<ReplyKind>;

    fn into_slots(self) -> Vec<Slot>;
}

impl Replies for () {
    fn kinds() -> Vec<ReplyKind> {
        Vec::new()
    }

    fn into_slots(self) -> Vec<Slot> {
        Vec::new()
    }
}

impl<R: Reply> Replies for R {
    fn kinds() -> Vec<ReplyKind> {
        vec![R::KIND]
    }

    fn into_slots(self) -> Vec<Slot> {
        vec![self.into_slot()]
    }
}

impl<T, E> Replies for Result<T, E>
where
    T: Reply,
    E: Into<BoxError> + Send + 'static,
{
    fn kinds() -> Vec<ReplyKind> {
        vec![T::KIND, ReplyKind::Error]
    }

    fn into_slots(self) -> Vec<Slot> {
        match self {
            Ok(value) => vec![value.into_slot(), Slot::Error(None)],
            Err(err) => vec![Slot::absent(), Slot::Error(Some(err.into()))],
        }
    }
}

impl<E> Replies for Result<(), E>
where
    E: Into<BoxError> + Send + 'static,
{
    fn kinds() -> Vec<ReplyKind> {
        vec![ReplyKind::Error]
    }

    fn into_slots(self) -> Vec<Slot> {
        vec![Slot::Error(self.err().map(Into::into))]
    }
}

macro_rules! replies_tuple {
    ($($ty:ident),+) => {
        impl<$($ty: Reply),+> Replies for ($($ty,)+) {
            fn kinds() -> Vec<ReplyKind> {
                vec![$($ty::KIND),+]
            }

            #[allow(non_snake_case)]
            fn into_slots(self) -> Vec<Slot> {
                let ($($ty,)+) = self;
                vec![$($ty.into_slot()),+]
            }
        }
    };
}

replies_tuple!(A, B);
replies_tuple!(A, B, C);

/// A strongly typed handler function.
pub trait Handler<Args>: Clone + Send + Sync + 'static {
    type Output: Replies;

    fn params() -> Vec<ArgKind>;

    fn call(&self, inputs: &[ArgInput<'_>]) -> Result<Self::Output, DecodeError>;
}

fn input<'a>(inputs: &[ArgInput<'a>], index: usize) -> Result<ArgInput<'a>, DecodeError> {
    inputs.get(index).copied().ok_or(DecodeError::Missing(index))
}

macro_rules! impl_handler {
    ($($ty:ident $idx:tt),*) => {
        impl<F, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Clone + Send + Sync + 'static,
            R: Replies,
            $($ty: Param,)*
        {
            type Output = R;

            fn params() -> Vec<ArgKind> {
                vec![$($ty::kind()),*]
            }

            #[allow(unused_variables)]
            fn call(&self, inputs: &[ArgInput<'_>]) -> Result<R, DecodeError> {
                Ok((self)($($ty::decode(input(inputs, $idx)?)?),*))
            }
        }
    };
}

impl_handler!();
impl_handler!(A0 0);
impl_handler!(A0 0, A1 1);
impl_handler!(A0 0, A1 1, A2 2);
impl_handler!(A0 0, A1 1, A2 2, A3 3);
impl_handler!(A0 0, A1 1, A2 2, A3 3, A4 4);
impl_handler!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5);
impl_handler!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6);
impl_handler!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6, A7 7);

/// Object-safe view of a [`Handler`].
pub trait ErasedHandler: Send + Sync {
    fn invoke(&self, inputs: &[ArgInput<'_>]) -> Result<Vec<Slot>, DecodeError>;
}

pub(crate) struct HandlerFn<H, Args> {
    handler: H,
    _marker: PhantomData<fn() -> Args>,
}

impl<H, Args> HandlerFn<H, Args> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<H, Args> ErasedHandler for HandlerFn<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn invoke(&self, inputs: &[ArgInput<'_>]) -> Result<Vec<Slot>, DecodeError> {
        self.handler.call(inputs).map(<H::Output as Replies>::into_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Item {
        val: i64,
    }

    fn params_of<Args, H: Handler<Args>>(_: H) -> Vec<ArgKind> {
        H::params()
    }

    fn kinds_of<Args, H: Handler<Args>>(_: H) -> Vec<ReplyKind> {
        <H::Output as Replies>::kinds()
    }

    #[test]
    fn test_param_kinds() {
        let kinds = params_of(|_: String, _: u16, _: Json<Item>, _: f32| ());
        assert_eq!(kinds[0], ArgKind::Scalar(ScalarKind::Str));
        assert_eq!(kinds[1], ArgKind::Scalar(ScalarKind::Uint(IntWidth::W16)));
        assert!(matches!(kinds[2], ArgKind::Structured(name) if name.ends_with("Item")));
        assert_eq!(kinds[3], ArgKind::Scalar(ScalarKind::Float(FloatWidth::W32)));
    }

    #[test]
    fn test_reply_kinds() {
        assert!(kinds_of(|| ()).is_empty());
        assert_eq!(kinds_of(|| 1i64), vec![ReplyKind::Body]);
        assert_eq!(kinds_of(|| Fault::none()), vec![ReplyKind::Error]);
        assert_eq!(
            kinds_of(|| -> Result<String, BoxError> { Ok(String::new()) }),
            vec![ReplyKind::Body, ReplyKind::Error]
        );
        assert_eq!(kinds_of(|| -> Result<(), BoxError> { Ok(()) }), vec![ReplyKind::Error]);
        assert_eq!(
            kinds_of(|| (Fault::none(), 0u8)),
            vec![ReplyKind::Error, ReplyKind::Body]
        );
    }

    #[test]
    fn test_decode_path_and_body() {
        assert_eq!(i32::decode(ArgInput::Path("-12")).unwrap(), -12);
        assert_eq!(i32::decode(ArgInput::Body(b"-12")).unwrap(), -12);
        assert_eq!(String::decode(ArgInput::Body(br#""cb""#)).unwrap(), "cb");
        assert!(String::decode(ArgInput::Body(b"")).is_err());

        let Json(item) = Json::<Item>::decode(ArgInput::Body(br#"{"val":3}"#)).unwrap();
        assert_eq!(item, Item { val: 3 });
        assert!(matches!(
            Json::<Item>::decode(ArgInput::Path("3")),
            Err(DecodeError::Structured(_))
        ));
    }

    #[test]
    fn test_slot_emptiness() {
        let empty = |slot: Slot| match slot {
            Slot::Body { empty, .. } => empty,
            Slot::Error(_) => panic!("not a body slot"),
        };
        assert!(empty(String::new().into_slot()));
        assert!(!empty("x".to_string().into_slot()));
        assert!(empty(None::<i64>.into_slot()));
        assert!(empty(Vec::<u8>::new().into_slot()));
        assert!(!empty(0i64.into_slot()));
        assert!(empty(serde_json::Value::Null.into_slot()));
        assert!(!empty(Json(Item { val: 0 }).into_slot()));
    }
}
