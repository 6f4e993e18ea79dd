use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkinshortcutsError {
    // Schema cycle errors - the only failures that abort a build.
    // Everything else (missing references, bad $MATH syntax) degrades
    // locally and is logged at debug level.
    #[error("EXPRESSION_CYCLE: expression '{name}' expands through itself")]
    ExpressionCycle { name: String },

    #[error("VARIABLE_GROUP_CYCLE: variable group '{name}' references itself")]
    VariableGroupCycle { name: String },
}

pub type Result<T> = std::result::Result<T, SkinshortcutsError>;
