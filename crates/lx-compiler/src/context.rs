use crate::*;

#[derive(Debug, Clone, Copy)]
pub(crate) enum ComponentNode<'a> {
    Function(&'a FunctionNode),
    Table(&'a TableNode),
    Enum(&'a EnumNode),
    Type(&'a TypeDefinitionNode),
    Scenario(&'a ScenarioNode),
}

impl<'a> ComponentNode<'a> {
    pub(crate) fn name(&self) -> &'a str {
        match self {
            Self::Function(node) => &node.name,
            Self::Table(node) => &node.name,
            Self::Enum(node) => &node.name,
            Self::Type(node) => &node.name,
            Self::Scenario(node) => &node.name,
        }
    }

    pub(crate) fn reference(&self) -> &'a SourceReference {
        match self {
            Self::Function(node) => &node.reference,
            Self::Table(node) => &node.reference,
            Self::Enum(node) => &node.reference,
            Self::Type(node) => &node.reference,
            Self::Scenario(node) => &node.reference,
        }
    }
}

/// Top-level declarations by name, inline scenario functions included.
#[derive(Debug, Default)]
pub(crate) struct ComponentNodes<'a> {
    by_name: BTreeMap<String, ComponentNode<'a>>,
    ordered: Vec<ComponentNode<'a>>,
}

impl<'a> ComponentNodes<'a> {
    pub(crate) fn collect(nodes: &'a [RootNode], diagnostics: &mut Diagnostics) -> Self {
        let mut components = Self::default();
        for node in nodes {
            match node {
                RootNode::Function(function) => {
                    components.add(ComponentNode::Function(function), diagnostics)
                }
                RootNode::Table(table) => components.add(ComponentNode::Table(table), diagnostics),
                RootNode::Enum(enumeration) => {
                    components.add(ComponentNode::Enum(enumeration), diagnostics)
                }
                RootNode::Type(declared) => components.add(ComponentNode::Type(declared), diagnostics),
                RootNode::Scenario(scenario) => {
                    components.add(ComponentNode::Scenario(scenario), diagnostics);
                    if let Some(function) = scenario.inline_function() {
                        components.add(ComponentNode::Function(function), diagnostics);
                    }
                }
            }
        }
        components
    }

    fn add(&mut self, node: ComponentNode<'a>, diagnostics: &mut Diagnostics) {
        if self.by_name.contains_key(node.name()) {
            diagnostics.fail_root(
                node.reference().clone(),
                format!("Duplicated node name: '{}'.", node.name()),
            );
            return;
        }
        self.by_name.insert(node.name().to_string(), node);
        self.ordered.push(node);
    }

    pub(crate) fn all(&self) -> Vec<ComponentNode<'a>> {
        self.ordered.clone()
    }

    pub(crate) fn get(&self, name: &str) -> Option<ComponentNode<'a>> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn function(&self, name: &str) -> Option<&'a FunctionNode> {
        match self.get(name)? {
            ComponentNode::Function(node) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn table(&self, name: &str) -> Option<&'a TableNode> {
        match self.get(name)? {
            ComponentNode::Table(node) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn enumeration(&self, name: &str) -> Option<&'a EnumNode> {
        match self.get(name)? {
            ComponentNode::Enum(node) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn declared_type(&self, name: &str) -> Option<&'a TypeDefinitionNode> {
        match self.get(name)? {
            ComponentNode::Type(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct VariableEntry {
    pub(crate) variable_type: VariableType,
    pub(crate) source: VariableSource,
}

impl VariableEntry {
    pub(crate) fn reference(&self, name: &str) -> VariableReference {
        VariableReference::new(self.source, VariablePath::parse(name))
    }
}

/// Scoped variable table. Names must be unique across all open scopes.
#[derive(Debug, Default)]
pub(crate) struct VariableContext {
    scopes: Vec<BTreeMap<String, VariableEntry>>,
}

impl VariableContext {
    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&VariableEntry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub(crate) fn add(&mut self, name: &str, entry: VariableEntry) {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), entry);
        }
    }
}

pub(crate) struct ValidationContext<'a> {
    pub(crate) diagnostics: Diagnostics,
    pub(crate) components: ComponentNodes<'a>,
    pub(crate) libraries: &'a LibraryRegistry,
    pub(crate) variables: VariableContext,
    current_node: Option<String>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl<'a> ValidationContext<'a> {
    pub(crate) fn new(
        nodes: &'a [RootNode],
        libraries: &'a LibraryRegistry,
        mut diagnostics: Diagnostics,
    ) -> Self {
        diagnostics.set_current_node(None);
        let components = ComponentNodes::collect(nodes, &mut diagnostics);
        let dependencies = components
            .all()
            .iter()
            .map(|node| (node.name().to_string(), BTreeSet::new()))
            .collect();
        Self {
            diagnostics,
            components,
            libraries,
            variables: VariableContext::default(),
            current_node: None,
            dependencies,
        }
    }

    pub(crate) fn enter_node(&mut self, name: &str) {
        trace!(node = name, "enter");
        self.current_node = Some(name.to_string());
        self.diagnostics.set_current_node(Some(name.to_string()));
        self.variables = VariableContext::default();
    }

    pub(crate) fn leave_node(&mut self, name: &str) {
        trace!(node = name, "leave");
        self.current_node = None;
        self.diagnostics.set_current_node(None);
    }

    pub(crate) fn fail(&mut self, reference: &SourceReference, message: impl Into<String>) {
        self.diagnostics.fail(reference.clone(), message);
    }

    /// Records that the node under validation references `name`.
    pub(crate) fn add_dependency(&mut self, name: &str) {
        let Some(current) = self.current_node.clone() else {
            return;
        };
        if self.components.get(name).is_some() {
            self.dependencies
                .entry(current)
                .or_default()
                .insert(name.to_string());
        }
    }

    pub(crate) fn in_scope<T>(&mut self, validate: impl FnOnce(&mut Self) -> T) -> T {
        self.variables.push_scope();
        let result = validate(self);
        self.variables.pop_scope();
        result
    }

    pub(crate) fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (node, dependencies) in &self.dependencies {
            graph.add_node(node);
            for dependency in dependencies {
                graph.add_edge(node, dependency);
            }
        }
        graph
    }

    pub(crate) fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

#[cfg(test)]
mod context_tests {
    use super::*;

    #[test]
    fn variable_lookup_sees_outer_scopes_until_popped() {
        let mut variables = VariableContext::default();
        variables.push_scope();
        variables.add(
            "Input",
            VariableEntry {
                variable_type: VariableType::NUMBER,
                source: VariableSource::Parameters,
            },
        );
        variables.push_scope();
        variables.add(
            "Local",
            VariableEntry {
                variable_type: VariableType::STRING,
                source: VariableSource::Code,
            },
        );
        assert!(variables.contains("Input"));
        assert!(variables.contains("Local"));
        variables.pop_scope();
        assert!(!variables.contains("Local"));
        assert_eq!(
            variables
                .get("Input")
                .map(|entry| entry.reference("Input").to_string()),
            Some("Input".to_string())
        );
    }

    #[test]
    fn duplicate_declaration_names_are_root_errors() {
        let reference = SourceReference::new("tests.lexy", 1, 1);
        let nodes = vec![
            RootNode::Function(FunctionNode::new("Tax", reference.clone())),
            RootNode::Function(FunctionNode::new(
                "Tax",
                SourceReference::new("tests.lexy", 5, 1),
            )),
        ];
        let mut diagnostics = Diagnostics::new();
        let components = ComponentNodes::collect(&nodes, &mut diagnostics);
        assert_eq!(components.all().len(), 1);
        assert_eq!(
            diagnostics.error_messages(),
            vec!["tests.lexy(5, 1): ERROR - Duplicated node name: 'Tax'.".to_string()]
        );
        assert!(diagnostics.has_root_errors());
    }
}
