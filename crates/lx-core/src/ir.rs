use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::error::LexyError;
use crate::types::{PrimitiveType, SourceReference, VariablePath};
use crate::value::{EnumValue, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Primitive(PrimitiveType),
    Enum(String),
    Object {
        type_name: String,
        fields: Vec<FieldIr>,
    },
}

impl FieldType {
    pub fn name(&self) -> String {
        match self {
            Self::Primitive(primitive) => primitive.name().to_string(),
            Self::Enum(name) => name.clone(),
            Self::Object { type_name, .. } => type_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldIr {
    pub name: String,
    pub field_type: FieldType,
    pub default: Value,
}

pub fn default_object(fields: &[FieldIr]) -> BTreeMap<String, Value> {
    fields
        .iter()
        .map(|field| (field.name.clone(), field.default.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableSource {
    Parameters,
    Results,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableReference {
    pub source: VariableSource,
    pub path: VariablePath,
}

impl VariableReference {
    pub fn new(source: VariableSource, path: VariablePath) -> Self {
        Self { source, path }
    }
}

impl fmt::Display for VariableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulus => "%",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Multiply | Self::Divide | Self::Modulus => 6,
            Self::Add | Self::Subtract => 5,
            Self::LessThan
            | Self::LessThanOrEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual => 4,
            Self::Equals | Self::NotEquals => 3,
            Self::And => 2,
            Self::Or => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Int,
    Abs,
    Power,
    Round,
    Now,
    Today,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl BuiltinFunction {
    pub const ALL: [BuiltinFunction; 18] = [
        Self::Int,
        Self::Abs,
        Self::Power,
        Self::Round,
        Self::Now,
        Self::Today,
        Self::Year,
        Self::Month,
        Self::Day,
        Self::Hour,
        Self::Minute,
        Self::Second,
        Self::Years,
        Self::Months,
        Self::Days,
        Self::Hours,
        Self::Minutes,
        Self::Seconds,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|function| function.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Abs => "ABS",
            Self::Power => "POWER",
            Self::Round => "ROUND",
            Self::Now => "NOW",
            Self::Today => "TODAY",
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
            Self::Years => "YEARS",
            Self::Months => "MONTHS",
            Self::Days => "DAYS",
            Self::Hours => "HOURS",
            Self::Minutes => "MINUTES",
            Self::Seconds => "SECONDS",
        }
    }

    pub fn argument_names(&self) -> &'static [&'static str] {
        match self {
            Self::Int | Self::Abs => &["Value"],
            Self::Power => &["Number", "Power"],
            Self::Round => &["Number", "Digits"],
            Self::Now | Self::Today => &[],
            Self::Year | Self::Month | Self::Day | Self::Hour | Self::Minute | Self::Second => {
                &["Date"]
            }
            Self::Years
            | Self::Months
            | Self::Days
            | Self::Hours
            | Self::Minutes
            | Self::Seconds => &["End", "Start"],
        }
    }

    pub fn argument_types(&self) -> &'static [PrimitiveType] {
        match self {
            Self::Int | Self::Abs => &[PrimitiveType::Number],
            Self::Power | Self::Round => &[PrimitiveType::Number, PrimitiveType::Number],
            Self::Now | Self::Today => &[],
            Self::Year | Self::Month | Self::Day | Self::Hour | Self::Minute | Self::Second => {
                &[PrimitiveType::Date]
            }
            Self::Years
            | Self::Months
            | Self::Days
            | Self::Hours
            | Self::Minutes
            | Self::Seconds => &[PrimitiveType::Date, PrimitiveType::Date],
        }
    }

    pub fn return_type(&self) -> PrimitiveType {
        match self {
            Self::Now | Self::Today => PrimitiveType::Date,
            _ => PrimitiveType::Number,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookUpResult {
    Column(String),
    Row,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorIr {
    pub column: String,
    pub value: ExpressionIr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookUpIr {
    pub table: String,
    pub search_column: String,
    pub value: ExpressionIr,
    pub discriminator: Option<DiscriminatorIr>,
    pub result: LookUpResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallArgumentsIr {
    /// An already shaped parameter object, passed as is.
    Object(ExpressionIr),
    Positional(Vec<(String, ExpressionIr)>),
    /// Parameters filled from same-named variables in scope.
    Spread(Vec<(String, VariableReference)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallIr {
    pub function: String,
    pub arguments: CallArgumentsIr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionIr {
    Literal(Value),
    Variable(VariableReference),
    TableCount(String),
    Binary {
        operator: BinaryOperator,
        left: Box<ExpressionIr>,
        right: Box<ExpressionIr>,
    },
    Builtin {
        function: BuiltinFunction,
        arguments: Vec<ExpressionIr>,
    },
    Library {
        library: String,
        function: String,
        arguments: Vec<ExpressionIr>,
    },
    LookUp(Box<LookUpIr>),
    New {
        type_name: String,
        fields: Vec<FieldIr>,
    },
    Fill {
        type_name: String,
        fields: Vec<FieldIr>,
        sources: Vec<(String, VariableReference)>,
    },
    Call(Box<FunctionCallIr>),
}

impl ExpressionIr {
    /// Variables read while evaluating this expression, in first-use order.
    pub fn collect_reads(&self, reads: &mut Vec<VariableReference>) {
        let push = |reference: &VariableReference, reads: &mut Vec<VariableReference>| {
            if !reads.contains(reference) {
                reads.push(reference.clone());
            }
        };
        match self {
            Self::Literal(_) | Self::TableCount(_) | Self::New { .. } => {}
            Self::Variable(reference) => push(reference, reads),
            Self::Binary { left, right, .. } => {
                left.collect_reads(reads);
                right.collect_reads(reads);
            }
            Self::Builtin { arguments, .. } | Self::Library { arguments, .. } => {
                for argument in arguments {
                    argument.collect_reads(reads);
                }
            }
            Self::LookUp(lookup) => {
                if let Some(discriminator) = &lookup.discriminator {
                    discriminator.value.collect_reads(reads);
                }
                lookup.value.collect_reads(reads);
            }
            Self::Fill { sources, .. } => {
                for (_, reference) in sources {
                    push(reference, reads);
                }
            }
            Self::Call(call) => match &call.arguments {
                CallArgumentsIr::Object(expression) => expression.collect_reads(reads),
                CallArgumentsIr::Positional(arguments) => {
                    for (_, argument) in arguments {
                        argument.collect_reads(reads);
                    }
                }
                CallArgumentsIr::Spread(sources) => {
                    for (_, reference) in sources {
                        push(reference, reads);
                    }
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub reference: SourceReference,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalIr {
    pub line: LogLine,
    pub condition: ExpressionIr,
    pub reads: Vec<VariableReference>,
    pub body: Vec<StatementIr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIr {
    pub line: LogLine,
    pub body: Vec<StatementIr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Declare {
        name: String,
        value: ExpressionIr,
    },
    Assign {
        target: VariableReference,
        value: ExpressionIr,
    },
    Evaluate(ExpressionIr),
    Extract {
        value: ExpressionIr,
        targets: Vec<(String, VariableReference)>,
    },
    SpreadCall {
        call: FunctionCallIr,
        targets: Vec<(String, VariableReference)>,
    },
    If {
        branches: Vec<ConditionalIr>,
        otherwise: Option<ElseIr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementIr {
    pub line: LogLine,
    pub reads: Vec<VariableReference>,
    pub writes: Vec<VariableReference>,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionIr {
    pub name: String,
    pub class_name: String,
    pub reference: SourceReference,
    pub parameters: Vec<FieldIr>,
    pub results: Vec<FieldIr>,
    pub body: Vec<StatementIr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberIr {
    pub name: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumIr {
    pub name: String,
    pub class_name: String,
    pub members: Vec<EnumMemberIr>,
}

impl EnumIr {
    pub fn tag(&self, member: &str) -> String {
        format!("{}.{}", self.name, member)
    }

    pub fn contains(&self, value: &EnumValue) -> bool {
        value.enum_name == self.name && self.members.iter().any(|member| member.name == value.member)
    }

    pub fn first_value(&self) -> Option<EnumValue> {
        self.members
            .first()
            .map(|member| EnumValue::new(self.name.clone(), member.name.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIr {
    pub name: String,
    pub column_type: FieldType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowIr {
    pub reference: SourceReference,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableIr {
    pub name: String,
    pub class_name: String,
    pub columns: Vec<ColumnIr>,
    pub rows: Vec<RowIr>,
}

impl TableIr {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn row_object(&self, row: &RowIr) -> BTreeMap<String, Value> {
        self.columns
            .iter()
            .zip(row.values.iter())
            .map(|(column, value)| (column.name.clone(), value.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeIr {
    pub name: String,
    pub class_name: String,
    pub fields: Vec<FieldIr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Function,
    Enum,
    Table,
    Type,
}

impl ComponentKind {
    pub fn class_prefix(&self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Enum => "Enum",
            Self::Table => "Table",
            Self::Type => "Type",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedComponent {
    Function(FunctionIr),
    Enum(EnumIr),
    Table(TableIr),
    Type(TypeIr),
}

impl GeneratedComponent {
    pub fn name(&self) -> &str {
        match self {
            Self::Function(function) => &function.name,
            Self::Enum(enumeration) => &enumeration.name,
            Self::Table(table) => &table.name,
            Self::Type(declared) => &declared.name,
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            Self::Function(function) => &function.class_name,
            Self::Enum(enumeration) => &enumeration.class_name,
            Self::Table(table) => &table.class_name,
            Self::Type(declared) => &declared.class_name,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Function(_) => ComponentKind::Function,
            Self::Enum(_) => ComponentKind::Enum,
            Self::Table(_) => ComponentKind::Table,
            Self::Type(_) => ComponentKind::Type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentIr {
    pub reference: SourceReference,
    pub path: VariablePath,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRowIr {
    pub reference: SourceReference,
    pub parameters: Vec<AssignmentIr>,
    pub results: Vec<AssignmentIr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioIr {
    pub name: String,
    pub reference: SourceReference,
    pub function: Option<String>,
    pub parameters: Vec<AssignmentIr>,
    pub results: Vec<AssignmentIr>,
    pub validation_rows: Vec<ValidationRowIr>,
    pub expect_errors: Vec<String>,
    pub expect_root_errors: Vec<String>,
    pub expect_execution_errors: Vec<String>,
}

impl ScenarioIr {
    pub fn expects_validation_errors(&self) -> bool {
        !self.expect_errors.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledProgram {
    components: BTreeMap<String, GeneratedComponent>,
    scenarios: BTreeMap<String, ScenarioIr>,
}

impl CompiledProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: GeneratedComponent) -> Result<(), LexyError> {
        if self
            .components
            .values()
            .any(|existing| existing.class_name() == component.class_name())
        {
            return Err(LexyError::internal(format!(
                "Duplicate generated class name \"{}\".",
                component.class_name()
            )));
        }
        self.components
            .insert(component.name().to_string(), component);
        Ok(())
    }

    pub fn insert_scenario(&mut self, scenario: ScenarioIr) {
        self.scenarios.insert(scenario.name.clone(), scenario);
    }

    pub fn components(&self) -> impl Iterator<Item = &GeneratedComponent> {
        self.components.values()
    }

    pub fn component(&self, name: &str) -> Option<&GeneratedComponent> {
        self.components.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionIr> {
        match self.components.get(name)? {
            GeneratedComponent::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableIr> {
        match self.components.get(name)? {
            GeneratedComponent::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumIr> {
        match self.components.get(name)? {
            GeneratedComponent::Enum(enumeration) => Some(enumeration),
            _ => None,
        }
    }

    pub fn declared_type(&self, name: &str) -> Option<&TypeIr> {
        match self.components.get(name)? {
            GeneratedComponent::Type(declared) => Some(declared),
            _ => None,
        }
    }

    pub fn scenarios(&self) -> impl Iterator<Item = &ScenarioIr> {
        self.scenarios.values()
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioIr> {
        self.scenarios.get(name)
    }
}

#[cfg(test)]
mod ir_tests {
    use super::*;

    fn number_field(name: &str, default: i64) -> FieldIr {
        FieldIr {
            name: name.to_string(),
            field_type: FieldType::Primitive(PrimitiveType::Number),
            default: Value::from(default),
        }
    }

    #[test]
    fn builtin_functions_resolve_by_exact_name() {
        assert_eq!(BuiltinFunction::from_name("POWER"), Some(BuiltinFunction::Power));
        assert_eq!(BuiltinFunction::from_name("power"), None);
        assert_eq!(
            BuiltinFunction::Years.argument_names(),
            &["End", "Start"]
        );
        assert_eq!(BuiltinFunction::Today.return_type(), PrimitiveType::Date);
    }

    #[test]
    fn collect_reads_deduplicates_variables() {
        let input = VariableReference::new(VariableSource::Parameters, VariablePath::parse("Input"));
        let expression = ExpressionIr::Binary {
            operator: BinaryOperator::Add,
            left: Box::new(ExpressionIr::Variable(input.clone())),
            right: Box::new(ExpressionIr::Variable(input.clone())),
        };
        let mut reads = Vec::new();
        expression.collect_reads(&mut reads);
        assert_eq!(reads, vec![input]);
    }

    #[test]
    fn program_rejects_duplicate_class_names() {
        let mut program = CompiledProgram::new();
        let declared = TypeIr {
            name: "Point".to_string(),
            class_name: "TypePoint".to_string(),
            fields: vec![number_field("X", 0)],
        };
        program
            .insert(GeneratedComponent::Type(declared.clone()))
            .expect("first insert");
        let error = program
            .insert(GeneratedComponent::Type(declared))
            .expect_err("duplicate class name");
        assert_eq!(error.code, "COMPILER_INTERNAL");
        assert!(program.declared_type("Point").is_some());
        assert!(program.function("Point").is_none());
    }

    #[test]
    fn default_object_uses_field_defaults() {
        let object = default_object(&[number_field("A", 1), number_field("B", 2)]);
        assert_eq!(object.get("B"), Some(&Value::from(2)));
    }
}
