//! Well-known IRIs and variable names used by script rules.

/// `xsd:string`
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// `xsd:integer`
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

/// `xsd:double`
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

/// `xsd:boolean`
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// `rdf:langString`, the datatype of every language-tagged literal.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// Ambient binding that exposes the data graph to script functions.
pub const DATA_VAR: &str = "data";

/// Ambient binding that exposes the shapes graph to script functions.
pub const SHAPES_VAR: &str = "shapes";

/// Call-frame variable holding the current focus node.
pub const THIS_VAR: &str = "this";

/// Prefix of every diagnostic label produced for a script rule.
pub const LABEL_START: &str = "JavaScript";
