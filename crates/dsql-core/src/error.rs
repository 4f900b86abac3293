//! Error types for rendering and building statements.

use thiserror::Error;

/// Errors raised while building or rendering SQL.
#[derive(Error, Debug)]
pub enum Error {
    /// The expression has no template to render.
    #[error("template is not defined")]
    TemplateNotDefined,

    /// A template tag has no matching argument and no built-in renderer.
    #[error("expression could not render tag {tag:?}")]
    UnresolvedTag {
        /// Tag name as it appeared in the template.
        tag: String,
    },

    /// A list operand was used where a scalar is required.
    #[error("list value is not allowed in this context")]
    ListValueNotAllowed,

    /// The same alias was registered twice.
    #[error("alias {alias:?} must be unique")]
    AliasMustBeUnique {
        /// Duplicated alias.
        alias: String,
    },

    /// An alias looks like an integer, which would be ambiguous in SQL.
    #[error("alias must not be numeric")]
    AliasMustBeNotNumeric,

    /// A table used as a subquery source has no alias.
    #[error("table alias is required when table is a subquery")]
    TableAliasRequired,

    /// A subquery was used as the target table of a write statement.
    #[error("table must not be a subquery for this statement mode")]
    TableMustNotBeQuery,

    /// A field string passed to a condition embeds an operator.
    #[error("field condition must be passed separately, got {field:?}")]
    FieldConditionMustBePassedSeparately {
        /// Field string containing the embedded operator.
        field: String,
    },

    /// The condition operator is not supported by the dialect.
    #[error("operator {operator:?} is not supported")]
    UnsupportedOperator {
        /// Normalized operator text.
        operator: String,
    },

    /// The operator cannot be combined with a NULL operand.
    #[error("operator {operator:?} cannot be used with NULL value")]
    UnsupportedNullOperator {
        /// Normalized operator text.
        operator: String,
    },

    /// The operator cannot be combined with a list operand.
    #[error("operator {operator:?} cannot be used with an array value")]
    UnsupportedListOperator {
        /// Normalized operator text.
        operator: String,
    },

    /// A list condition contains a NULL element.
    #[error("null value in IN list is not supported")]
    NullInListCondition,

    /// A list operator was combined with a plain scalar value.
    #[error("operator {operator:?} cannot be used with a non-list value")]
    UnsupportedScalarOperator {
        /// Normalized operator text.
        operator: String,
    },

    /// A set clause value has an unsupported shape.
    #[error("set value must be scalar or expression")]
    UnsupportedSetValue,

    /// An order-by field name contains a comma.
    #[error("order by field must not contain a comma, got {field:?}")]
    OrderFieldWithComma {
        /// Offending field string.
        field: String,
    },

    /// Where and having conditions were mixed in one subtree.
    #[error("where and having conditions must not be mixed")]
    MixedWhereHaving,

    /// The statement mode is not recognized or not available on this dialect.
    #[error("unsupported statement mode {mode:?}")]
    UnsupportedMode {
        /// Requested mode string.
        mode: String,
    },

    /// The dialect has no aggregate string-concatenation function hook.
    #[error("group_concat is not supported by dialect {dialect:?}")]
    UnsupportedGroupConcat {
        /// Dialect name.
        dialect: &'static str,
    },

    /// A typed column cannot be used with the given operator on this dialect.
    #[error("operator {operator:?} is not supported for {type_name} fields")]
    UnsupportedTypedFieldOperator {
        /// Normalized operator text.
        operator: String,
        /// Column type name as reported by the dialect.
        type_name: &'static str,
    },

    /// A case-when entry does not match the statement form in use.
    #[error("incorrect use of case when parameters")]
    InvalidCaseWhen,

    /// In-band payload decoding failed.
    #[error("encoded payload is invalid: {reason}")]
    InvalidEncodedPayload {
        /// Human-readable failure reason.
        reason: String,
    },
}

/// Convenient result alias for fallible builder operations.
pub type Result<T> = std::result::Result<T, Error>;
