//! Introspection documents served by `org.freedesktop.DBus.Introspectable`.

use super::path::ObjectRef;

/// Document for `object`, in D-Bus introspection format.
pub fn introspection_xml(object: &ObjectRef) -> &'static str {
    match object {
        ObjectRef::Manager => INTROSPECTION_XML,
        ObjectRef::Target(_) => TARGET_INTROSPECTION_XML,
        ObjectRef::Job(_) => JOB_INTROSPECTION_XML,
    }
}

/// Manager object document.
pub const INTROSPECTION_XML: &str = r#"<!DOCTYPE node PUBLIC "-//freedesktop//DTD D-BUS Object Introspection 1.0//EN"
"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd">
<node>
  <interface name="org.freedesktop.DBus.Peer">
    <method name="Ping"/>
    <method name="GetMachineId">
      <arg type="s" name="machine_uuid" direction="out"/>
    </method>
  </interface>
  <interface name="org.freedesktop.DBus.Introspectable">
    <method name="Introspect">
      <arg name="xml_data" type="s" direction="out"/>
    </method>
  </interface>
  <interface name="org.freedesktop.DBus.Properties">
    <method name="Get">
      <arg name="interface_name" direction="in" type="s"/>
      <arg name="property_name" direction="in" type="s"/>
      <arg name="value" direction="out" type="v"/>
    </method>
    <method name="GetAll">
      <arg name="interface_name" direction="in" type="s"/>
      <arg name="props" direction="out" type="a{sv}"/>
    </method>
    <method name="Set">
      <arg name="interface_name" direction="in" type="s"/>
      <arg name="property_name" direction="in" type="s"/>
      <arg name="value" direction="in" type="v"/>
    </method>
    <signal name="PropertiesChanged">
      <arg type="s" name="interface_name"/>
      <arg type="a{sv}" name="changed_properties"/>
      <arg type="as" name="invalidated_properties"/>
    </signal>
  </interface>
  <interface name="org.freedesktop.sysupdate1.Manager">
    <method name="ListTargets">
      <arg type="a(sso)" name="targets" direction="out"/>
    </method>
    <method name="ListJobs">
      <arg type="a(tsuo)" name="jobs" direction="out"/>
    </method>
    <method name="ListAppStream">
      <arg type="as" name="urls" direction="out"/>
    </method>
    <signal name="JobRemoved">
      <arg type="t" name="id"/>
      <arg type="o" name="path"/>
      <arg type="i" name="status"/>
    </signal>
  </interface>
  <node name="target"/>
  <node name="job"/>
</node>
"#;

const TARGET_INTROSPECTION_XML: &str = r#"<!DOCTYPE node PUBLIC "-//freedesktop//DTD D-BUS Object Introspection 1.0//EN"
"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd">
<node>
<interface name="org.freedesktop.sysupdate1.Target">
  <property type="s" name="Class" access="read"/>
  <property type="s" name="Name" access="read"/>
  <property type="s" name="Path" access="read"/>
  <method name="List">
    <arg type="b" name="offline" direction="in"/>
    <arg type="as" name="versions" direction="out"/>
  </method>
  <method name="Describe">
    <arg type="s" name="version" direction="in"/>
    <arg type="b" name="offline" direction="in"/>
    <arg type="s" name="json" direction="out"/>
  </method>
  <method name="CheckNew">
    <arg type="s" name="new_version" direction="out"/>
  </method>
  <method name="Update">
    <arg type="s" name="new_version" direction="in"/>
    <arg type="t" name="flags" direction="in"/>
    <arg type="s" name="new_version" direction="out"/>
    <arg type="t" name="job_id" direction="out"/>
    <arg type="o" name="job_path" direction="out"/>
  </method>
  <method name="Vacuum">
    <arg type="u" name="count" direction="out"/>
  </method>
  <method name="GetAppStream">
    <arg type="as" name="appstream" direction="out"/>
  </method>
  <method name="GetVersion">
    <arg type="s" name="version" direction="out"/>
  </method>
</interface>
</node>
"#;

const JOB_INTROSPECTION_XML: &str = r#"<!DOCTYPE node PUBLIC "-//freedesktop//DTD D-BUS Object Introspection 1.0//EN"
"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd">
<node>
<interface name="org.freedesktop.sysupdate1.Job">
  <property type="t" name="Id" access="read"/>
  <property type="s" name="Type" access="read"/>
  <property type="b" name="Offline" access="read"/>
  <property type="u" name="Progress" access="read"/>
  <method name="Cancel"/>
</interface>
</node>
"#;
