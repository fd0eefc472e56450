//! Type name qualification against a file's package and imports.

/// Package and single-type imports of one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileContext {
    pub package: Option<String>,
    /// Imported type names, e.g. `com.shop.dao.OrderDao`; wildcard and
    /// static imports are not kept.
    pub imports: Vec<String>,
}

impl FileContext {
    pub fn new(package: Option<String>, imports: Vec<String>) -> Self {
        Self { package, imports }
    }

    /// Fully qualified name of a type declared in this file
    pub fn declared_type_name(&self, nested_name: &str) -> String {
        match &self.package {
            Some(package) => format!("{package}.{nested_name}"),
            None => nested_name.to_string(),
        }
    }

    /// Qualify a type name as written at a use site.
    ///
    /// Dotted names are kept. A bare name takes the import ending in it,
    /// else the file's package, else stays bare.
    pub fn qualify(&self, type_name: &str) -> String {
        if type_name.contains('.') {
            return type_name.to_string();
        }
        if let Some(import) = self
            .imports
            .iter()
            .find(|import| import.rsplit('.').next() == Some(type_name))
        {
            return import.clone();
        }
        self.declared_type_name(type_name)
    }
}

/// Reduce a declared type to the class a call would dispatch on.
///
/// `List<Order>` gives `List`, `Order[]` and `Order...` give `Order`;
/// annotations and whitespace are dropped.
pub fn reduce_type_name(declared: &str) -> String {
    let without_generics = declared.split('<').next().unwrap_or(declared);
    let without_annotations = without_generics
        .split_whitespace()
        .filter(|part| !part.starts_with('@'))
        .collect::<String>();
    without_annotations
        .trim_end_matches("...")
        .trim_end_matches("[]")
        .trim_end_matches("[]")
        .trim_end_matches("[]")
        .to_string()
}
