//! 角色层：声明式角色画像、单一的角色状态机与数据公司的标准阵容

pub mod presets;
pub mod profile;
pub mod role;

pub use presets::{business_analyst, data_architect, data_engineer, project_manager, standard_profiles};
pub use profile::{ContextStrategy, RoleProfile, TodoPolicy, TodoSource};
pub use role::{Role, RoleOutput, RoleState, MSG_SEP};
