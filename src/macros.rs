/// Declares a toolbox namespace: a struct whose fields are populated by the
/// [`Factory`](crate::Factory).
///
/// Each field may carry a tag after `=>`: logical file names
/// (`"redis|cache"`) or `"omit"`. Untagged fields are looked up by their own
/// name.
///
/// ```
/// use envbox::toolbox;
///
/// toolbox! {
///     #[derive(Debug, Default)]
///     pub struct Storage {
///         pub retries: u32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! toolbox {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Namespace for $name {
            fn visit_fields(
                &mut self,
                visitor: &mut dyn $crate::FieldVisitor,
            ) -> ::std::result::Result<(), $crate::Error> {
                $(
                    visitor.visit_field(
                        $crate::FieldDef::new(stringify!($field), concat!("" $(, $tag)?)),
                        &mut self.$field,
                    )?;
                )*
                ::std::result::Result::Ok(())
            }
        }

        impl $crate::Node for $name {
            fn node_mut(&mut self) -> $crate::NodeMut<'_> {
                $crate::NodeMut::Namespace(self)
            }

            fn is_zero(&self) -> bool {
                true $(&& $crate::Node::is_zero(&self.$field))*
            }
        }
    };
}

/// Declares a config struct whose fields carry `env=`, `default=` and
/// `required` directives, applied after decoding.
///
/// Directives are keyed by the Rust field name and looked up under that
/// name in the serialized value. A field renamed with `#[serde(rename)]` or
/// a struct using `#[serde(rename_all)]` is serialized under another key, so
/// its `default` and `required` directives never see it.
#[macro_export]
macro_rules! config {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::config::Tagged for $name {
            fn shape() -> $crate::config::Shape {
                static FIELDS: ::std::sync::OnceLock<::std::vec::Vec<$crate::config::TaggedField>> =
                    ::std::sync::OnceLock::new();
                $crate::config::Shape::Struct(FIELDS.get_or_init(|| {
                    ::std::vec![
                        $(
                            $crate::config::TaggedField::new(
                                stringify!($field),
                                concat!("" $(, $tag)?),
                                <$ty as $crate::config::Tagged>::shape,
                            ),
                        )*
                    ]
                }))
            }
        }
    };
}

/// Makes a [`Component`](crate::Component) usable as a toolbox field.
///
/// - `component!(A, B)`: zero means equal to `Default::default()`.
/// - `component!(A, |this| expr)`: custom zero check.
/// - `component!(config A)`: also implements `Component` for a `config!`
///   struct, loading it from the located files (or from one document when it
///   is a collection element).
#[macro_export]
macro_rules! component {
    (@node $ty:ty, |$this:ident| $zero:expr) => {
        impl $crate::Node for $ty {
            fn node_mut(&mut self) -> $crate::NodeMut<'_> {
                $crate::NodeMut::Component(self)
            }

            fn is_zero(&self) -> bool {
                let $this = self;
                $zero
            }
        }
    };
    (config $ty:ty) => {
        impl $crate::Component for $ty {
            fn contract(&self) -> $crate::Contract {
                $crate::Contract::ALL
            }

            fn configure(
                &mut self,
                files: &[::std::path::PathBuf],
            ) -> ::std::result::Result<(), $crate::ComponentError> {
                *self = $crate::config::load_config(files)?;
                ::std::result::Result::Ok(())
            }

            fn configure_bytes(
                &mut self,
                bytes: &[u8],
            ) -> ::std::result::Result<(), $crate::ComponentError> {
                *self = $crate::config::unmarshal(bytes)?;
                ::std::result::Result::Ok(())
            }
        }

        $crate::component!($ty);
    };
    ($ty:ty, |$this:ident| $zero:expr) => {
        $crate::component!(@node $ty, |$this| $zero);
    };
    ($($ty:ty),+ $(,)?) => {
        $(
            $crate::component!(@node $ty, |this| *this == <$ty as ::std::default::Default>::default());
        )+
    };
}
