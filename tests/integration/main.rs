//! Integration tests: tools, agent turns and the HTTP surface wired
//! together over a scripted transport and a scripted model.

mod mock_transport;
mod scripted_model;

mod agent_flow;
mod tool_flow;
mod trading_flow;
