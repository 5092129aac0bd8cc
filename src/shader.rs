//! WGSL source and binding numbers for the lightmap pipeline.
//!
//! The numbers here are the contract between [`LightmapVertex::LAYOUT`],
//! the bind group layouts built by [`LightmapPass`] and `lightmap.wgsl`.
//! Location 1 is skipped on purpose: the slot stays free for a per-vertex
//! attribute this pass does not read.
//!
//! [`LightmapVertex::LAYOUT`]: crate::LightmapVertex::LAYOUT
//! [`LightmapPass`]: crate::LightmapPass

/// The lightmap pass shader (`vs` + `fs`).
pub const LIGHTMAP_WGSL: &str = include_str!("shaders/lightmap.wgsl");

pub const VERTEX_ENTRY: &str = "vs";
pub const FRAGMENT_ENTRY: &str = "fs";

/// Bind group holding the [`TransformBlock`](crate::TransformBlock).
pub const TRANSFORM_GROUP: u32 = 0;
/// Binding of the transform block within its group.
pub const TRANSFORM_BINDING: u32 = 0;

pub const POSITION_LOCATION: u32 = 0;
pub const TEXCOORD0_LOCATION: u32 = 2;
pub const TEXCOORD1_LOCATION: u32 = 3;

pub const OUT_TEXCOORD0_LOCATION: u32 = 0;
pub const OUT_TEXCOORD1_LOCATION: u32 = 1;

/// Bind group holding the material textures and samplers.
pub const MATERIAL_GROUP: u32 = 1;
pub const DIFFUSE_TEXTURE_BINDING: u32 = 0;
pub const DIFFUSE_SAMPLER_BINDING: u32 = 1;
pub const LIGHTMAP_TEXTURE_BINDING: u32 = 2;
pub const LIGHTMAP_SAMPLER_BINDING: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse() -> naga::Module {
        let module = naga::front::wgsl::parse_str(LIGHTMAP_WGSL)
            .unwrap_or_else(|e| panic!("WGSL parse error: {:?}", e));

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .unwrap_or_else(|e| panic!("WGSL validation error: {:?}", e));

        module
    }

    fn entry<'a>(module: &'a naga::Module, name: &str) -> &'a naga::EntryPoint {
        module
            .entry_points
            .iter()
            .find(|ep| ep.name == name)
            .unwrap_or_else(|| panic!("missing entry point {}", name))
    }

    fn struct_locations(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Vec<(String, u32)> {
        match &module.types[ty].inner {
            naga::TypeInner::Struct { members, .. } => members
                .iter()
                .filter_map(|m| match &m.binding {
                    Some(naga::Binding::Location { location, .. }) => {
                        Some((m.name.clone().unwrap_or_default(), *location))
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Flattens a constant expression into its scalar components.
    fn const_floats(
        module: &naga::Module,
        exprs: &naga::Arena<naga::Expression>,
        h: naga::Handle<naga::Expression>,
    ) -> Vec<f32> {
        match &exprs[h] {
            naga::Expression::Literal(naga::Literal::F32(v)) => vec![*v],
            naga::Expression::Literal(naga::Literal::AbstractFloat(v)) => vec![*v as f32],
            naga::Expression::Compose { components, .. } => components
                .iter()
                .flat_map(|&c| const_floats(module, exprs, c))
                .collect(),
            naga::Expression::Splat { size, value } => {
                const_floats(module, exprs, *value).repeat(*size as usize)
            }
            naga::Expression::Unary {
                op: naga::UnaryOperator::Negate,
                expr,
            } => const_floats(module, exprs, *expr)
                .into_iter()
                .map(|v| -v)
                .collect(),
            naga::Expression::ZeroValue(ty) => {
                let count = match module.types[*ty].inner {
                    naga::TypeInner::Scalar(_) => 1,
                    naga::TypeInner::Vector { size, .. } => size as usize,
                    naga::TypeInner::Matrix { columns, rows, .. } => {
                        columns as usize * rows as usize
                    }
                    ref other => panic!("unexpected zero value of {:?}", other),
                };
                vec![0.0; count]
            }
            naga::Expression::Constant(c) => {
                let init = module.constants[*c].init;
                const_floats(module, &module.global_expressions, init)
            }
            other => panic!("not a constant expression: {:?}", other),
        }
    }

    /// Index of the `transforms` member an expression loads, if any.
    fn transform_member(
        module: &naga::Module,
        exprs: &naga::Arena<naga::Expression>,
        h: naga::Handle<naga::Expression>,
    ) -> Option<u32> {
        let naga::Expression::Load { pointer } = exprs[h] else {
            return None;
        };
        let naga::Expression::AccessIndex { base, index } = exprs[pointer] else {
            return None;
        };
        match exprs[base] {
            naga::Expression::GlobalVariable(gv)
                if module.global_variables[gv].space == naga::AddressSpace::Uniform =>
            {
                Some(index)
            }
            _ => None,
        }
    }

    /// Operands of the vertex stage's product chain, leftmost first.
    fn clip_chain(module: &naga::Module) -> Vec<naga::Handle<naga::Expression>> {
        let exprs = &entry(module, VERTEX_ENTRY).function.expressions;
        let is_mul = |h: naga::Handle<naga::Expression>| {
            matches!(
                exprs[h],
                naga::Expression::Binary {
                    op: naga::BinaryOperator::Multiply,
                    ..
                }
            )
        };

        let lefts: Vec<_> = exprs
            .iter()
            .filter_map(|(_, e)| match *e {
                naga::Expression::Binary {
                    op: naga::BinaryOperator::Multiply,
                    left,
                    ..
                } => Some(left),
                _ => None,
            })
            .collect();
        let tops: Vec<_> = exprs
            .iter()
            .map(|(h, _)| h)
            .filter(|&h| is_mul(h) && !lefts.contains(&h))
            .collect();
        assert_eq!(tops.len(), 1, "vs should hold a single product chain");

        let mut operands = Vec::new();
        let mut cur = tops[0];
        while let naga::Expression::Binary {
            op: naga::BinaryOperator::Multiply,
            left,
            right,
        } = exprs[cur]
        {
            operands.push(right);
            cur = left;
        }
        operands.push(cur);
        operands.reverse();
        operands
    }

    #[test]
    fn vertex_stage_multiplies_model_view_proj_then_clip_adjust() {
        let module = parse();
        let exprs = &entry(&module, VERTEX_ENTRY).function.expressions;
        let chain = clip_chain(&module);
        assert_eq!(chain.len(), 5);

        assert!(matches!(exprs[chain[0]], naga::Expression::Compose { .. }));
        let members: Vec<_> = chain[1..4]
            .iter()
            .map(|&h| transform_member(&module, exprs, h))
            .collect();
        assert_eq!(members, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(transform_member(&module, exprs, chain[4]), None);
    }

    #[test]
    fn shader_clip_adjust_matches_cpu_constant() {
        let module = parse();
        let exprs = &entry(&module, VERTEX_ENTRY).function.expressions;
        let chain = clip_chain(&module);

        let columns = const_floats(&module, exprs, chain[4]);
        assert_eq!(columns, crate::CLIP_ADJUST.to_cols_array().to_vec());
    }

    #[test]
    fn shader_parses_and_validates() {
        let module = parse();
        assert_eq!(entry(&module, VERTEX_ENTRY).stage, naga::ShaderStage::Vertex);
        assert_eq!(entry(&module, FRAGMENT_ENTRY).stage, naga::ShaderStage::Fragment);
    }

    #[test]
    fn vertex_inputs_use_locations_0_2_3() {
        let module = parse();
        let vs = entry(&module, VERTEX_ENTRY);
        assert_eq!(vs.function.arguments.len(), 1);

        let inputs = struct_locations(&module, vs.function.arguments[0].ty);
        assert_eq!(
            inputs,
            vec![
                ("position".to_string(), POSITION_LOCATION),
                ("texcoord0".to_string(), TEXCOORD0_LOCATION),
                ("texcoord1".to_string(), TEXCOORD1_LOCATION),
            ]
        );
        assert!(inputs.iter().all(|(_, loc)| *loc != 1));
    }

    #[test]
    fn vertex_outputs_use_locations_0_1_plus_position() {
        let module = parse();
        let vs = entry(&module, VERTEX_ENTRY);
        let result = vs.function.result.as_ref().expect("vs returns a struct");

        let outputs = struct_locations(&module, result.ty);
        assert_eq!(
            outputs,
            vec![
                ("texcoord0".to_string(), OUT_TEXCOORD0_LOCATION),
                ("texcoord1".to_string(), OUT_TEXCOORD1_LOCATION),
            ]
        );

        let has_position = match &module.types[result.ty].inner {
            naga::TypeInner::Struct { members, .. } => members.iter().any(|m| {
                matches!(
                    m.binding,
                    Some(naga::Binding::BuiltIn(naga::BuiltIn::Position { .. }))
                )
            }),
            _ => false,
        };
        assert!(has_position);
    }

    #[test]
    fn transform_block_is_bound_at_group0_binding0() {
        let module = parse();
        let (_, uniform) = module
            .global_variables
            .iter()
            .find(|(_, gv)| gv.space == naga::AddressSpace::Uniform)
            .expect("uniform block");

        let binding = uniform.binding.as_ref().expect("resource binding");
        assert_eq!(binding.group, TRANSFORM_GROUP);
        assert_eq!(binding.binding, TRANSFORM_BINDING);

        match &module.types[uniform.ty].inner {
            naga::TypeInner::Struct { members, span } => {
                let names: Vec<_> = members.iter().filter_map(|m| m.name.as_deref()).collect();
                assert_eq!(names, ["model", "view", "proj"]);
                assert_eq!(
                    *span as usize,
                    std::mem::size_of::<crate::TransformBlock>()
                );
            }
            other => panic!("transform block is not a struct: {:?}", other),
        }
    }

    #[test]
    fn material_bindings_match_constants() {
        let module = parse();
        let mut bindings: Vec<(String, u32, u32)> = module
            .global_variables
            .iter()
            .filter_map(|(_, gv)| {
                let rb = gv.binding.as_ref()?;
                Some((gv.name.clone().unwrap_or_default(), rb.group, rb.binding))
            })
            .filter(|(_, group, _)| *group == MATERIAL_GROUP)
            .collect();
        bindings.sort_by_key(|(_, _, b)| *b);

        assert_eq!(
            bindings,
            vec![
                ("diffuse_texture".to_string(), MATERIAL_GROUP, DIFFUSE_TEXTURE_BINDING),
                ("diffuse_sampler".to_string(), MATERIAL_GROUP, DIFFUSE_SAMPLER_BINDING),
                ("lightmap_texture".to_string(), MATERIAL_GROUP, LIGHTMAP_TEXTURE_BINDING),
                ("lightmap_sampler".to_string(), MATERIAL_GROUP, LIGHTMAP_SAMPLER_BINDING),
            ]
        );
    }
}
