use std::borrow::Cow;

/// A name/value pair attached to a metric.
///
/// In this protocol dialect, labels are not sent as tags: the label value becomes an additional trailing segment of
/// the metric name. The name identifies the label for callers, but is not rendered on the wire.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Label(Cow<'static, str>, Cow<'static, str>);

impl Label {
    /// Creates a [`Label`] from a name and value.
    pub fn new<N, V>(name: N, value: V) -> Self
    where
        N: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        Label(name.into(), value.into())
    }

    /// Creates a [`Label`] from a static name and value.
    pub const fn from_static_parts(name: &'static str, value: &'static str) -> Self {
        Label(Cow::Borrowed(name), Cow::Borrowed(value))
    }

    /// Name of this label.
    pub fn name(&self) -> &str {
        self.0.as_ref()
    }

    /// Value of this label.
    pub fn value(&self) -> &str {
        self.1.as_ref()
    }
}

impl<N, V> From<(N, V)> for Label
where
    N: Into<Cow<'static, str>>,
    V: Into<Cow<'static, str>>,
{
    fn from(pair: (N, V)) -> Label {
        Label::new(pair.0, pair.1)
    }
}
