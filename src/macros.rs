/// Builds [`ScopeVariables`](crate::ScopeVariables) from `name => value`
/// pairs.
///
/// Names may be any expression implementing `ToString`, values anything
/// [`ScopeValue`](crate::ScopeValue) converts from. Use
/// [`ScopeValue::opaque`](crate::ScopeValue::opaque) for values that have no
/// plain-data form.
///
/// # Examples
///
/// ```
/// use faultline::{ScopeValue, scope};
///
/// let handle = std::io::stdout();
/// let scope = scope! {
///     "user_id" => 42,
///     "retry" => true,
///     "path" => "/index",
///     "stdout" => ScopeValue::opaque(&handle),
/// };
/// assert_eq!(scope["user_id"], ScopeValue::Integer(42));
/// assert!(!scope["stdout"].is_serializable());
/// ```
#[macro_export]
macro_rules! scope {
    () => {
        $crate::ScopeVariables::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut scope = $crate::ScopeVariables::new();
        $(
            scope.insert(
                $crate::__private::ToString::to_string(&$name),
                $crate::ScopeValue::from($value),
            );
        )+
        scope
    }};
}

/// Raises a non-fatal fault at the current source location.
///
/// The first argument is the dispatcher, the second the
/// [`FaultLevel`](crate::FaultLevel). An optional block of
/// `name => value` pairs becomes the record's scope variables, and the
/// remaining arguments are formatted like [`format!`] into the message.
///
/// Expands to a call to
/// [`FaultDispatcher::handle_fault`](crate::FaultDispatcher::handle_fault)
/// and evaluates to its result.
///
/// # Examples
///
/// ```
/// use faultline::{Disposition, FaultDispatcher, FaultLevel, Options, trigger};
///
/// let dispatcher = FaultDispatcher::builder()
///     .options(Options::new().write(false).display(false))
///     .build();
///
/// let attempts = 3;
/// let disposition = trigger!(
///     dispatcher,
///     FaultLevel::USER_NOTICE,
///     { "attempts" => attempts },
///     "upstream answered after {attempts} attempts"
/// );
/// assert_eq!(disposition.unwrap(), Disposition::Discarded);
/// ```
#[macro_export]
macro_rules! trigger {
    ($dispatcher:expr, $level:expr, { $($name:expr => $value:expr),* $(,)? }, $($arg:tt)+) => {
        $dispatcher.handle_fault(
            $level,
            $crate::__private::format!($($arg)+),
            $crate::__private::file!(),
            $crate::__private::line!(),
            $crate::scope!($($name => $value),*),
        )
    };
    ($dispatcher:expr, $level:expr, $($arg:tt)+) => {
        $dispatcher.handle_fault(
            $level,
            $crate::__private::format!($($arg)+),
            $crate::__private::file!(),
            $crate::__private::line!(),
            $crate::ScopeVariables::new(),
        )
    };
}
