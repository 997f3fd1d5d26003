/// Build a [`ProcedureDescriptor`](crate::ProcedureDescriptor) from a signature.
///
/// Parameter types go through [`Typed`](crate::Typed); a parameter without a type is
/// untyped and accepts any value. Defaults follow `=` and must convert into a
/// [`Value`](crate::Value). The return type, if written, is only documentation.
///
/// ```
/// use contractrpc::{procedure, CallingConvention, Type};
///
/// let add = procedure!(fn add(a: i64, b: i64 = 0) -> i64);
/// assert_eq!(add.params()[0].ty, Type::Int);
/// assert!(add.params()[1].default.is_some());
///
/// let fetch = procedure!(async fn fetch(id, verbose: bool = false));
/// assert_eq!(fetch.convention(), CallingConvention::Async);
/// assert_eq!(fetch.params()[0].ty, Type::Any);
/// ```
#[macro_export]
macro_rules! procedure {
    (@param $name:ident : $ty:ty = $default:expr) => {
        $crate::Param::optional(
            stringify!($name),
            <$ty as $crate::Typed>::rpc_type(),
            $default,
        )
    };
    (@param $name:ident : $ty:ty) => {
        $crate::Param::required(stringify!($name), <$ty as $crate::Typed>::rpc_type())
    };
    (@param $name:ident = $default:expr) => {
        $crate::Param::optional(stringify!($name), $crate::Type::Any, $default)
    };
    (@param $name:ident) => {
        $crate::Param::untyped(stringify!($name))
    };
    (async fn $proc:ident ( $($name:ident $(: $ty:ty)? $(= $default:expr)?),* $(,)? ) $(-> $ret:ty)?) => {
        $crate::ProcedureDescriptor::asynchronous(stringify!($proc))
            $(.param($crate::procedure!(@param $name $(: $ty)? $(= $default)?)))*
    };
    (fn $proc:ident ( $($name:ident $(: $ty:ty)? $(= $default:expr)?),* $(,)? ) $(-> $ret:ty)?) => {
        $crate::ProcedureDescriptor::sync(stringify!($proc))
            $(.param($crate::procedure!(@param $name $(: $ty)? $(= $default)?)))*
    };
}

/// Declare an interface type and the procedures it marks as remote.
///
/// ```
/// contractrpc::interface! {
///     /// Remote arithmetic.
///     pub struct Calculator {
///         fn add(a: i64, b: i64) -> i64;
///         async fn fetch(id: i64);
///     }
/// }
///
/// let names = contractrpc::list_procedures::<Calculator>();
/// assert_eq!(names.len(), 2);
/// ```
#[macro_export]
macro_rules! interface {
    (@procs [$($acc:expr,)*]) => {
        vec![$($acc),*]
    };
    (@procs [$($acc:expr,)*] async fn $proc:ident ($($args:tt)*) $(-> $ret:ty)? ; $($rest:tt)*) => {
        $crate::interface!(@procs [$($acc,)* $crate::procedure!(async fn $proc($($args)*)),] $($rest)*)
    };
    (@procs [$($acc:expr,)*] fn $proc:ident ($($args:tt)*) $(-> $ret:ty)? ; $($rest:tt)*) => {
        $crate::interface!(@procs [$($acc,)* $crate::procedure!(fn $proc($($args)*)),] $($rest)*)
    };
    ($(#[$meta:meta])* $vis:vis struct $name:ident { $($body:tt)* }) => {
        $(#[$meta])*
        $vis struct $name;

        impl $crate::Interface for $name {
            const NAME: &'static str = stringify!($name);

            fn procedures() -> Vec<$crate::ProcedureDescriptor> {
                $crate::interface!(@procs [] $($body)*)
            }
        }
    };
}
